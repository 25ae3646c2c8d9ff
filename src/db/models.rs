use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identity::KnownEntry;
use crate::resolver::ResolvedFact;

/// Highest rating an entry can carry; 0 means unrated.
pub const MAX_RATING: u8 = 5;

/// Data for logging a song.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEntry {
    pub title: String,
    pub artist: String,
    pub track_id: Option<String>,
    pub source_url: Option<String>,
    pub note: String,
    pub tags: Vec<String>,
    pub rating: u8,
}

impl NewEntry {
    /// Entry for a resolved fact, without note, tags or rating.
    pub fn from_fact(fact: &ResolvedFact) -> Self {
        Self {
            title: fact.title.clone(),
            artist: fact.artist.clone(),
            track_id: fact.track_id.clone(),
            source_url: Some(fact.source_url.clone()),
            ..Self::default()
        }
    }
}

/// A logged song read from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub track_id: Option<String>,
    pub source_url: Option<String>,
    pub note: String,
    pub tags: Vec<String>,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

impl From<&LogEntry> for KnownEntry {
    fn from(e: &LogEntry) -> Self {
        KnownEntry {
            track_id: e.track_id.clone(),
            title: e.title.clone(),
            artist: e.artist.clone(),
        }
    }
}

/// Summary numbers for the log.
#[derive(Debug, Default)]
pub struct LogStats {
    pub total_entries: i64,
    pub with_track_id: i64,
    pub distinct_artists: i64,
    pub rated_entries: i64,
    pub mean_rating: Option<f64>,
    pub artists: Vec<(String, i64)>,
    pub tags: Vec<(String, i64)>,
}
