//! Transcript archive: SQLite store for completed transcriptions.
//!
//! One row per successful transcription. Rows are never mutated or deleted by
//! the gateway; cleanup is manual.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

/// One row in the `transcripts` table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TranscriptRow {
    pub id: String,
    pub filename: String,
    pub text: String,
    pub created_at_ms: i64,
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Storage for transcription records.
pub struct TranscriptStore {
    db_path: PathBuf,
}

impl TranscriptStore {
    /// Open or create the DB and ensure the transcripts table exists.
    pub fn new(db_path: PathBuf) -> Result<Self, rusqlite::Error> {
        let this = Self { db_path };
        this.init()?;
        Ok(this)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection, rusqlite::Error> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
    }

    fn init(&self) -> Result<(), rusqlite::Error> {
        if let Some(parent) = self.db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transcripts (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transcripts_created_at ON transcripts(created_at_ms);
            "#,
        )?;
        Ok(())
    }

    /// Insert a completed transcription and return its row.
    pub fn insert(&self, filename: &str, text: &str) -> Result<TranscriptRow, rusqlite::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let ts = now_ms();
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO transcripts (id, filename, text, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![id, filename, text, ts],
        )?;
        Ok(TranscriptRow {
            id,
            filename: filename.to_string(),
            text: text.to_string(),
            created_at_ms: ts,
        })
    }

    /// List records, newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<TranscriptRow>, rusqlite::Error> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, filename, text, created_at_ms FROM transcripts
             ORDER BY created_at_ms DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |r| {
                Ok(TranscriptRow {
                    id: r.get(0)?,
                    filename: r.get(1)?,
                    text: r.get(2)?,
                    created_at_ms: r.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get a record by id.
    pub fn get(&self, id: &str) -> Result<Option<TranscriptRow>, rusqlite::Error> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT id, filename, text, created_at_ms FROM transcripts WHERE id = ?1",
                params![id],
                |r| {
                    Ok(TranscriptRow {
                        id: r.get(0)?,
                        filename: r.get(1)?,
                        text: r.get(2)?,
                        created_at_ms: r.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
