//! Local draft store.
//!
//! The whole [`EditRegistry`] is kept as one JSON document in SQLite, so
//! pinned-product edits that have not been saved to the backend survive a
//! restart.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::collections::EditRegistry;
use crate::error::StorageError;

pub const DEFAULT_DATA_DIR: &str = ".curator";
const DATABASE_FILE: &str = "curator.db";
const DRAFTS_KEY: &str = "drafts";

pub struct DraftStore {
    conn: Connection,
    path: PathBuf,
}

impl DraftStore {
    /// Opens (creating if needed) the draft database under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir).map_err(|source| StorageError::DataDir {
            path: data_dir.display().to_string(),
            source,
        })?;
        let path = data_dir.join(DATABASE_FILE);
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS app_state (
             state_key TEXT PRIMARY KEY,
             state_json TEXT NOT NULL,
             updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
           );",
        )?;
        debug!(path = %path.display(), "opened draft store");
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored drafts, or an empty registry on first use.
    pub fn load(&self) -> Result<EditRegistry, StorageError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM app_state WHERE state_key = ?1 LIMIT 1;",
                params![DRAFTS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(EditRegistry::new());
        };
        let mut registry: EditRegistry = serde_json::from_str(&raw)?;
        registry.settle();
        debug!(collections = registry.len(), "loaded drafts");
        Ok(registry)
    }

    pub fn save(&self, registry: &EditRegistry) -> Result<(), StorageError> {
        let raw = serde_json::to_string(registry)?;
        self.conn.execute(
            "INSERT INTO app_state (state_key, state_json, updated_at)
           VALUES (?1, ?2, strftime('%s','now'))
           ON CONFLICT(state_key)
           DO UPDATE SET
             state_json = excluded.state_json,
             updated_at = excluded.updated_at;",
            params![DRAFTS_KEY, raw],
        )?;
        debug!(collections = registry.len(), "saved drafts");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM app_state WHERE state_key = ?1;", params![DRAFTS_KEY])?;
        Ok(())
    }
}
