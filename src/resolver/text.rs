use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

// One alternation so every escape is consumed in a single left-to-right pass.
// "&amp;lt;" therefore decodes to "&lt;", never to "<".
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:amp|quot|apos|lt|gt|#0*39|#[xX]0*27);").unwrap()
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// Zero-width and bidi marks; share page titles often start with U+200E.
static INVISIBLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{200B}-\u{200F}\u{2060}\u{FEFF}]").unwrap());

// Storefront template tails, e.g.
//   "ODD Foot Worksの「時をBABE」をApple Musicで"
//   "Song by Artist on Apple Music"
//   "Album - Apple Music"
static BOILERPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \s*
        (?:
            を\s*apple\s*music\s*で(?:\s*聴く)?
          | apple\s*music\s*で\s*聴く
          | \s on \s+ apple \s+ music
          | [-–—|] \s* apple \s+ music
        )
        \s*$"
    )
    .unwrap()
});

/// Quote pairs stripped when they enclose the whole string.
const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('“', '”'),
    ('‘', '’'),
    ('「', '」'),
    ('『', '』'),
    ('｢', '｣'),
];

/// Replace the fixed set of named/numeric escapes with their characters.
///
/// Returns the input borrowed when it contains no escapes.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    ENTITY_RE.replace_all(input, |caps: &Captures| {
        match &caps[0] {
            "&amp;" => "&",
            "&quot;" => "\"",
            "&lt;" => "<",
            "&gt;" => ">",
            // &apos; and the numeric apostrophe forms
            _ => "'",
        }
    })
}

/// Collapse whitespace runs to a single space and trim the ends.
pub fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RE.replace_all(input, " ").trim().to_string()
}

/// Cut a trailing "listen on the store" phrase, if present.
fn strip_boilerplate(input: &str) -> String {
    match BOILERPLATE_RE.find(input) {
        Some(m) => input[..m.start()].to_string(),
        None => input.to_string(),
    }
}

/// Remove one quote pair wrapping the entire text.
fn strip_enclosing_quotes(input: &str) -> String {
    let mut chars = input.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return input.to_string();
    };
    let encloses = QUOTE_PAIRS
        .iter()
        .any(|&(open, close)| first == open && last == close);
    if encloses {
        chars.as_str().to_string()
    } else {
        input.to_string()
    }
}

fn normalize_once(input: &str) -> String {
    let decoded = decode_entities(input);
    let visible = INVISIBLE_RE.replace_all(&decoded, "");
    let collapsed = collapse_whitespace(&visible);
    let trimmed = strip_boilerplate(&collapsed);
    let unquoted = strip_enclosing_quotes(trimmed.trim());
    collapse_whitespace(&unquoted)
}

/// Clean a metadata string: decode escapes, drop the storefront tail, unwrap
/// enclosing quotes, collapse whitespace.
///
/// Passes repeat until the text stops changing. No step ever lengthens the
/// text, so the loop terminates and the result is a fixed point:
/// `normalize(normalize(s)) == normalize(s)`. Each pass decodes one level,
/// so nested escapes such as `&amp;lt;` end up fully decoded (`<`).
pub fn normalize(input: &str) -> String {
    let mut current = normalize_once(input);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
