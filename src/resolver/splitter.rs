use regex::Regex;
use std::sync::LazyLock;

use super::text::normalize;

/// Outcome of splitting a page title into title and artist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub title: String,
    pub artist: Option<String>,
    /// Name of the strategy that produced this split.
    pub strategy: &'static str,
}

pub type Strategy = fn(&str) -> Option<(String, String)>;

/// Strategies in priority order; the first that yields both halves wins.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("possessive_quote", possessive_quote),
    ("possessive", possessive),
    ("dash", dash),
];

/// Name reported when no strategy matched.
pub const UNSPLIT: &str = "unsplit";

// ODD Foot Worksの「時をBABE」
static POSSESSIVE_QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?P<artist>.+?)の[「『｢](?P<title>.+)[」』｣]$").unwrap()
});

// ODD Foot Works の 時をBABE
// Splits at the first の; titles that contain の themselves are mis-split.
static POSSESSIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?P<artist>.+?)の(?P<title>.+)$").unwrap()
});

// Hyphen, en dash or em dash with whitespace on both sides
static DASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s[-–—]\s").unwrap());

fn possessive_quote(text: &str) -> Option<(String, String)> {
    let caps = POSSESSIVE_QUOTE_RE.captures(text)?;
    Some((caps["title"].to_string(), caps["artist"].to_string()))
}

fn possessive(text: &str) -> Option<(String, String)> {
    let caps = POSSESSIVE_RE.captures(text)?;
    Some((caps["title"].to_string(), caps["artist"].to_string()))
}

/// "Title - Artist": split at the first dash token; anything after it,
/// including further dashes, is the artist.
fn dash(text: &str) -> Option<(String, String)> {
    let m = DASH_RE.find(text)?;
    Some((text[..m.start()].to_string(), text[m.end()..].to_string()))
}

/// Split a title string using the first strategy that yields a non-empty
/// title and artist after normalization. Falls back to the whole normalized
/// text as the title with no artist.
pub fn split_title_artist(text: &str) -> Split {
    let text = normalize(text);

    for &(name, strategy) in STRATEGIES {
        let Some((title, artist)) = strategy(&text) else {
            continue;
        };
        let (title, artist) = (normalize(&title), normalize(&artist));
        if title.is_empty() || artist.is_empty() {
            log::debug!("strategy {name} matched {text:?} but left an empty half");
            continue;
        }
        log::debug!("strategy {name}: title={title:?} artist={artist:?}");
        return Split {
            title,
            artist: Some(artist),
            strategy: name,
        };
    }

    Split {
        title: text,
        artist: None,
        strategy: UNSPLIT,
    }
}

/// Middle dot used by the storefront between description fields,
/// e.g. "Song · 2019 · ODD Foot Works".
const DESCRIPTION_SEPARATOR: char = '·';

/// Recover an artist from a description by taking its last `·` segment.
/// Needs at least two non-empty segments.
pub fn artist_from_description(description: &str) -> Option<String> {
    let segments: Vec<String> = description
        .split(DESCRIPTION_SEPARATOR)
        .map(normalize)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.len() < 2 {
        return None;
    }
    segments.into_iter().last()
}
