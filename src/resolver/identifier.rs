use url::Url;

/// Query parameter the storefront uses to point at a single track inside an
/// album link (`/album/name/123?i=456`).
const ITEM_PARAM: &str = "i";

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Pull the numeric track identifier out of a share URL.
///
/// The `i` query parameter wins; otherwise the last non-empty path segment is
/// used. Either must be all ASCII digits. Unparsable URLs yield `None`.
pub fn extract_track_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;

    let from_query = parsed
        .query_pairs()
        .find(|(k, _)| k == ITEM_PARAM)
        .map(|(_, v)| v.into_owned())
        .filter(|v| is_numeric_id(v));
    if from_query.is_some() {
        return from_query;
    }

    parsed
        .path_segments()?
        .filter(|seg| !seg.is_empty())
        .last()
        .filter(|seg| is_numeric_id(seg))
        .map(|seg| seg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_param() {
        assert_eq!(
            extract_track_id("https://music.apple.com/jp/album/foo/1440000000?i=1440000123").as_deref(),
            Some("1440000123")
        );
    }

    #[test]
    fn test_item_param_among_others() {
        assert_eq!(
            extract_track_id("https://music.apple.com/jp/album/foo/1?ls=1&i=987654&app=music").as_deref(),
            Some("987654")
        );
    }

    #[test]
    fn test_item_param_preferred_over_path() {
        assert_eq!(
            extract_track_id("https://music.apple.com/us/album/x/111?i=222").as_deref(),
            Some("222")
        );
    }

    #[test]
    fn test_non_numeric_item_param_falls_back_to_path() {
        assert_eq!(
            extract_track_id("https://music.apple.com/us/album/x/111?i=abc").as_deref(),
            Some("111")
        );
    }

    #[test]
    fn test_trailing_path_segment() {
        assert_eq!(
            extract_track_id("https://music.apple.com/jp/song/%E6%99%82/1530000001").as_deref(),
            Some("1530000001")
        );
        // Trailing slash is ignored
        assert_eq!(
            extract_track_id("https://music.apple.com/jp/song/x/42/").as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_no_identifier() {
        assert_eq!(extract_track_id("https://music.apple.com/jp/song/name"), None);
        assert_eq!(extract_track_id("https://music.apple.com/"), None);
        assert_eq!(extract_track_id("https://music.apple.com/jp/album/x/id123"), None);
    }

    #[test]
    fn test_unparsable() {
        assert_eq!(extract_track_id("not a url"), None);
        assert_eq!(extract_track_id(""), None);
    }

    #[test]
    fn test_only_digits_accepted() {
        assert!(is_numeric_id("0123"));
        assert!(!is_numeric_id(""));
        assert!(!is_numeric_id("12a"));
        assert!(!is_numeric_id("１２")); // full-width digits
        assert!(!is_numeric_id("-12"));
    }
}
