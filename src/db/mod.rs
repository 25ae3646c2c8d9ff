pub mod models;
pub mod queries;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::identity::KnownEntry;
use models::{LogEntry, NewEntry};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Rating must be between 0 and 5, got {0}")]
    InvalidRating(u8),
    #[error("Tag encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Where logged songs live. The resolver never touches this; callers load
/// the known entries, check a fact against them, then save.
pub trait LogStore {
    /// Every entry, oldest first.
    fn load_entries(&self) -> Result<Vec<LogEntry>>;

    /// Persist a new entry and return it with its generated id and timestamp.
    fn save_entry(&self, entry: &NewEntry) -> Result<LogEntry>;

    /// Entries reduced to what a duplicate check compares.
    fn known_entries(&self) -> Result<Vec<KnownEntry>> {
        Ok(self.load_entries()?.iter().map(KnownEntry::from).collect())
    }
}

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.migrate()?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if version > SCHEMA_VERSION {
            return Err(DbError::Migration(format!(
                "database schema v{version} is newer than supported v{SCHEMA_VERSION}"
            )));
        }
        if version < 1 {
            self.migrate_v1()?;
        }

        self.conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// V1: song log
    fn migrate_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entries (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                artist      TEXT NOT NULL DEFAULT '',
                track_id    TEXT,
                source_url  TEXT,
                note        TEXT NOT NULL DEFAULT '',
                tags        TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
                rating      INTEGER NOT NULL DEFAULT 0 CHECK (rating BETWEEN 0 AND 5),
                created_at  TEXT NOT NULL            -- RFC 3339, UTC
            );

            CREATE INDEX IF NOT EXISTS idx_entries_track_id ON entries(track_id);
            CREATE INDEX IF NOT EXISTS idx_entries_created ON entries(created_at);
            ",
        )?;
        Ok(())
    }
}

const SCHEMA_VERSION: i32 = 1;

impl LogStore for Database {
    fn load_entries(&self) -> Result<Vec<LogEntry>> {
        self.all_entries()
    }

    fn save_entry(&self, entry: &NewEntry) -> Result<LogEntry> {
        self.insert_entry(entry)
    }
}
