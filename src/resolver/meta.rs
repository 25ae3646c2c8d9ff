//! Metadata lookup over raw page text.
//!
//! This is pattern matching on the document text, not a markup parser. Share
//! pages are not a contracted format, so the scan only assumes that metadata
//! lives in `<meta ...>` tags with `property`/`name` and `content` attributes
//! in any order and with either quote style.

use regex::Regex;
use std::sync::LazyLock;

// A whole <meta ...> tag. Quoted values may contain '>' so they are consumed
// as units instead of stopping at the first '>'.
static META_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap()
});

// name=value with double, single, or no quotes
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)(?P<name>[A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\s"'>]+))"#,
    )
    .unwrap()
});

static TITLE_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title\b[^>]*>(?P<text>.*?)</title\s*>").unwrap()
});

/// Attributes of one meta tag, in document order.
fn attributes(tag: &str) -> Vec<(String, &str)> {
    ATTR_RE
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.name("name")?.as_str().to_ascii_lowercase();
            let value = caps
                .name("dq")
                .or_else(|| caps.name("sq"))
                .or_else(|| caps.name("bare"))?
                .as_str();
            Some((name, value))
        })
        .collect()
}

/// Return the raw `content` of the first meta tag whose `property` or `name`
/// equals `key` (case-insensitive). Values are not entity-decoded.
pub fn read_meta(html: &str, key: &str) -> Option<String> {
    for tag in META_TAG_RE.find_iter(html) {
        let attrs = attributes(tag.as_str());

        let matches_key = attrs.iter().any(|(name, value)| {
            (name == "property" || name == "name") && value.trim().eq_ignore_ascii_case(key)
        });
        if !matches_key {
            continue;
        }

        if let Some((_, content)) = attrs.iter().find(|(name, _)| name == "content") {
            log::trace!("meta {key} -> {content:?}");
            return Some((*content).to_string());
        }
    }
    None
}

/// Text of the first `<title>` element, raw.
pub fn read_title_element(html: &str) -> Option<String> {
    TITLE_ELEMENT_RE
        .captures(html)
        .and_then(|caps| caps.name("text"))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_before_content() {
        let html = r#"<head><meta property="og:title" content="Song - Artist"></head>"#;
        assert_eq!(read_meta(html, "og:title").as_deref(), Some("Song - Artist"));
    }

    #[test]
    fn test_content_before_property() {
        let html = r#"<meta content="Song - Artist" property="og:title" />"#;
        assert_eq!(read_meta(html, "og:title").as_deref(), Some("Song - Artist"));
    }

    #[test]
    fn test_single_quotes() {
        let html = "<meta property='og:title' content='It \"works\"'>";
        assert_eq!(read_meta(html, "og:title").as_deref(), Some("It \"works\""));
    }

    #[test]
    fn test_name_attribute() {
        let html = r#"<meta name="description" content="Song · 2019 · Artist">"#;
        assert_eq!(
            read_meta(html, "description").as_deref(),
            Some("Song · 2019 · Artist")
        );
    }

    #[test]
    fn test_key_and_tag_case_insensitive() {
        let html = r#"<META Property="OG:Title" CONTENT="Loud">"#;
        assert_eq!(read_meta(html, "og:title").as_deref(), Some("Loud"));
    }

    #[test]
    fn test_content_with_angle_brackets_and_newlines() {
        let html = "<meta property=\"og:title\" content=\"a > b\nc <d>\">";
        assert_eq!(read_meta(html, "og:title").as_deref(), Some("a > b\nc <d>"));
    }

    #[test]
    fn test_first_match_wins() {
        let html = r#"
            <meta property="og:title" content="First">
            <meta property="og:title" content="Second">
        "#;
        assert_eq!(read_meta(html, "og:title").as_deref(), Some("First"));
    }

    #[test]
    fn test_other_keys_ignored() {
        let html = r#"
            <meta property="og:description" content="Not a title">
            <meta name="twitter:title" content="Twitter">
        "#;
        assert_eq!(read_meta(html, "og:title"), None);
        assert_eq!(read_meta(html, "twitter:title").as_deref(), Some("Twitter"));
    }

    #[test]
    fn test_content_is_raw() {
        let html = r#"<meta property="og:title" content="Tom &amp; Jerry">"#;
        assert_eq!(read_meta(html, "og:title").as_deref(), Some("Tom &amp; Jerry"));
    }

    #[test]
    fn test_tag_without_content_skipped() {
        let html = r#"
            <meta property="og:title">
            <meta property="og:title" content="Real">
        "#;
        assert_eq!(read_meta(html, "og:title").as_deref(), Some("Real"));
    }

    #[test]
    fn test_value_containing_key_text_is_not_a_match() {
        let html = r#"<meta property="og:description" content="og:title">"#;
        assert_eq!(read_meta(html, "og:title"), None);
    }

    #[test]
    fn test_title_element() {
        let html = "<html><head><TITLE lang=\"ja\">\n  曲名 - 歌手\n</TITLE></head></html>";
        assert_eq!(
            read_title_element(html).as_deref(),
            Some("\n  曲名 - 歌手\n")
        );
        assert_eq!(read_title_element("<html></html>"), None);
    }
}
