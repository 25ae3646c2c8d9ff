use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Row, params};
use uuid::Uuid;

use super::models::{LogEntry, LogStats, MAX_RATING, NewEntry};
use super::{Database, DbError, Result};

const ENTRY_COLUMNS: &str =
    "id, title, artist, track_id, source_url, note, tags, rating, created_at";

/// Build a `LogEntry` from a row selected with `ENTRY_COLUMNS`.
fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let tags_json: String = row.get(6)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    let created_raw: String = row.get(8)?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(LogEntry {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        track_id: row.get(3)?,
        source_url: row.get(4)?,
        note: row.get(5)?,
        tags,
        rating: row.get(7)?,
        created_at,
    })
}

/// Trim tags, dropping empties and repeats while keeping first-seen order.
fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

impl Database {
    /// Insert a log entry. Generates the id and timestamp.
    pub fn insert_entry(&self, e: &NewEntry) -> Result<LogEntry> {
        if e.rating > MAX_RATING {
            return Err(DbError::InvalidRating(e.rating));
        }

        let entry = LogEntry {
            id: Uuid::new_v4().to_string(),
            title: e.title.clone(),
            artist: e.artist.clone(),
            track_id: e.track_id.clone(),
            source_url: e.source_url.clone(),
            note: e.note.trim().to_string(),
            tags: clean_tags(&e.tags),
            rating: e.rating,
            // Stored at microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
        };
        let tags_json = serde_json::to_string(&entry.tags)?;

        self.conn.execute(
            "INSERT INTO entries (
                id, title, artist, track_id, source_url, note, tags, rating, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.id,
                entry.title,
                entry.artist,
                entry.track_id,
                entry.source_url,
                entry.note,
                tags_json,
                entry.rating,
                entry.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        log::debug!("Inserted entry {} ({:?})", entry.id, entry.title);
        Ok(entry)
    }

    /// All entries, oldest first.
    pub fn all_entries(&self) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries ORDER BY created_at, rowid"
        ))?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent_entries(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))?;
        let entries = stmt
            .query_map(params![limit as i64], entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Look up an entry by its id.
    pub fn get_entry(&self, id: &str) -> Result<Option<LogEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], entry_from_row)?;
        Ok(rows.next().transpose()?)
    }

    /// Summary counts for `songlink stats`.
    pub fn stats(&self) -> Result<LogStats> {
        let (total_entries, with_track_id, distinct_artists, rated_entries, mean_rating): (
            i64,
            i64,
            i64,
            i64,
            Option<f64>,
        ) = self.conn.query_row(
                "SELECT COUNT(*),
                        COUNT(track_id),
                        COUNT(DISTINCT NULLIF(LOWER(artist), '')),
                        COUNT(NULLIF(rating, 0)),
                        AVG(NULLIF(rating, 0))
                 FROM entries",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )?;

        let mut artist_stmt = self.conn.prepare(
            "SELECT artist, COUNT(*) FROM entries
             WHERE artist != ''
             GROUP BY LOWER(artist)
             ORDER BY COUNT(*) DESC, artist
             LIMIT 10",
        )?;
        let artists: Vec<(String, i64)> = artist_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut tag_stmt = self.conn.prepare(
            "SELECT j.value, COUNT(*) FROM entries, json_each(entries.tags) AS j
             GROUP BY j.value
             ORDER BY COUNT(*) DESC, j.value
             LIMIT 10",
        )?;
        let tags: Vec<(String, i64)> = tag_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LogStats {
            total_entries,
            with_track_id,
            distinct_artists,
            rated_entries,
            mean_rating,
            artists,
            tags,
        })
    }
}
