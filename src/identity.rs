use std::fmt;

use serde::Serialize;

use crate::resolver::{PLACEHOLDER_TITLE, ResolvedFact};

/// A song the caller already has, as far as duplicate checks care.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KnownEntry {
    pub track_id: Option<String>,
    pub title: String,
    pub artist: String,
}

/// Normalized `(artist, title)` used for weak identity.
///
/// Each half is lower-cased, whitespace runs collapse to one space, ends are
/// trimmed. The halves are joined with `\n`, which normalization never
/// leaves inside either half.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(String);

fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl IdentityKey {
    pub fn new(artist: &str, title: &str) -> Self {
        Self(format!("{}\n{}", fold(artist), fold(title)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.replace('\n', " / "))
    }
}

/// Outcome of a duplicate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStatus {
    New,
    Duplicate,
    /// No identifier and no usable title/artist to compare.
    Uncertain,
}

impl DuplicateStatus {
    /// Only a definite duplicate should stop the caller.
    pub fn is_blocking(self) -> bool {
        self == Self::Duplicate
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Duplicate => "duplicate",
            Self::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for DuplicateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the fact carries nothing to compare textually.
fn lacks_text_identity(candidate: &ResolvedFact) -> bool {
    let title = candidate.title.trim();
    candidate.artist.trim().is_empty() && (title.is_empty() || title == PLACEHOLDER_TITLE)
}

/// Index of the entry `candidate` duplicates, with the status.
///
/// A track id on the candidate decides alone: no match means `New`, without
/// falling back to text comparison.
pub fn find_duplicate(
    candidate: &ResolvedFact,
    known: &[KnownEntry],
) -> (DuplicateStatus, Option<usize>) {
    if let Some(id) = &candidate.track_id {
        return match known
            .iter()
            .position(|k| k.track_id.as_deref() == Some(id.as_str()))
        {
            Some(i) => (DuplicateStatus::Duplicate, Some(i)),
            None => (DuplicateStatus::New, None),
        };
    }

    if lacks_text_identity(candidate) {
        return (DuplicateStatus::Uncertain, None);
    }

    let key = IdentityKey::new(&candidate.artist, &candidate.title);
    match known
        .iter()
        .position(|k| IdentityKey::new(&k.artist, &k.title) == key)
    {
        Some(i) => (DuplicateStatus::Duplicate, Some(i)),
        None => (DuplicateStatus::New, None),
    }
}

/// Decide whether `candidate` is already among `known`.
pub fn check_duplicate(candidate: &ResolvedFact, known: &[KnownEntry]) -> DuplicateStatus {
    let (status, _) = find_duplicate(candidate, known);
    log::debug!("duplicate check for {:?}: {status}", candidate.title);
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(title: &str, artist: &str, track_id: Option<&str>) -> ResolvedFact {
        ResolvedFact {
            title: title.to_string(),
            artist: artist.to_string(),
            track_id: track_id.map(str::to_string),
            source_url: "https://music.apple.com/jp/song/x/1".to_string(),
        }
    }

    fn entry(title: &str, artist: &str, track_id: Option<&str>) -> KnownEntry {
        KnownEntry {
            track_id: track_id.map(str::to_string),
            title: title.to_string(),
            artist: artist.to_string(),
        }
    }

    #[test]
    fn test_identity_key_folds_case_and_whitespace() {
        assert_eq!(
            IdentityKey::new("  ODD   Foot Works ", "時を\tBABE"),
            IdentityKey::new("odd foot works", "時を BABE")
        );
        assert_ne!(
            IdentityKey::new("Artist", "Song"),
            IdentityKey::new("Artist", "Song 2")
        );
    }

    #[test]
    fn test_identity_key_halves_do_not_bleed() {
        assert_ne!(IdentityKey::new("a b", "c"), IdentityKey::new("a", "b c"));
    }

    #[test]
    fn test_identity_key_display() {
        assert_eq!(IdentityKey::new("Artist", "Song").to_string(), "artist / song");
    }

    #[test]
    fn test_strong_match_despite_different_title() {
        let known = [entry("Old Title", "Someone", Some("123"))];
        let candidate = fact("New Title", "Someone Else", Some("123"));
        assert_eq!(check_duplicate(&candidate, &known), DuplicateStatus::Duplicate);
    }

    #[test]
    fn test_strong_miss_does_not_fall_back_to_text() {
        let known = [entry("Song", "Artist", Some("999"))];
        let candidate = fact("Song", "Artist", Some("123"));
        assert_eq!(check_duplicate(&candidate, &known), DuplicateStatus::New);

        // Known entry without an id does not match an id-bearing candidate either
        let known = [entry("Song", "Artist", None)];
        assert_eq!(check_duplicate(&candidate, &known), DuplicateStatus::New);
    }

    #[test]
    fn test_weak_match_case_and_whitespace_insensitive() {
        let known = [
            entry("Other", "Someone", None),
            entry("時をBABE", "ODD Foot Works", Some("555")),
        ];
        let candidate = fact("  時をbabe ", "odd  foot   WORKS", None);
        assert_eq!(
            find_duplicate(&candidate, &known),
            (DuplicateStatus::Duplicate, Some(1))
        );
    }

    #[test]
    fn test_weak_miss() {
        let known = [entry("Song", "Artist", None)];
        let candidate = fact("Song", "Different Artist", None);
        assert_eq!(check_duplicate(&candidate, &known), DuplicateStatus::New);
    }

    #[test]
    fn test_title_only_candidate_compares_weakly() {
        let known = [entry("Lonely Title", "", None)];
        let candidate = fact("lonely title", "", None);
        assert_eq!(check_duplicate(&candidate, &known), DuplicateStatus::Duplicate);
    }

    #[test]
    fn test_placeholder_without_artist_is_uncertain() {
        let known = [entry(PLACEHOLDER_TITLE, "", None)];
        let candidate = fact(PLACEHOLDER_TITLE, "", None);
        assert_eq!(check_duplicate(&candidate, &known), DuplicateStatus::Uncertain);
        assert!(!DuplicateStatus::Uncertain.is_blocking());
    }

    #[test]
    fn test_placeholder_with_track_id_is_checked_strongly() {
        let known = [entry("Song", "Artist", Some("42"))];
        let candidate = fact(PLACEHOLDER_TITLE, "", Some("42"));
        assert_eq!(check_duplicate(&candidate, &known), DuplicateStatus::Duplicate);
    }

    #[test]
    fn test_empty_collection() {
        assert_eq!(
            check_duplicate(&fact("Song", "Artist", None), &[]),
            DuplicateStatus::New
        );
        assert_eq!(
            check_duplicate(&fact("Song", "Artist", Some("1")), &[]),
            DuplicateStatus::New
        );
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DuplicateStatus::New.to_string(), "new");
        assert_eq!(DuplicateStatus::Duplicate.to_string(), "duplicate");
        assert_eq!(
            serde_json::to_value(DuplicateStatus::Uncertain).unwrap(),
            serde_json::json!("uncertain")
        );
        assert!(DuplicateStatus::Duplicate.is_blocking());
        assert!(!DuplicateStatus::New.is_blocking());
    }
}
