//! Persisted application state (settings document and sync status)

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::models::{PersistedSyncStatus, SettingsDocument};

const SETTINGS_KEY: &str = "settings";
const SYNC_STATUS_KEY: &str = "sync_status";

/// Trait for small JSON state blobs kept next to the notes
pub trait StateRepository {
    /// Load the settings document, falling back to defaults
    fn load_settings(&self) -> Result<SettingsDocument>;

    fn save_settings(&self, document: &SettingsDocument) -> Result<()>;

    fn load_sync_status(&self) -> Result<PersistedSyncStatus>;

    fn save_sync_status(&self, status: &PersistedSyncStatus) -> Result<()>;
}

/// `SQLite` implementation of `StateRepository`
pub struct SqliteStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStateRepository<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn get<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(value),
                Err(error) => {
                    tracing::warn!("Discarding unreadable '{key}' state: {error}");
                    Ok(T::default())
                }
            },
            None => Ok(T::default()),
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO app_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, raw],
        )?;
        Ok(())
    }
}

impl StateRepository for SqliteStateRepository<'_> {
    fn load_settings(&self) -> Result<SettingsDocument> {
        self.get(SETTINGS_KEY)
    }

    fn save_settings(&self, document: &SettingsDocument) -> Result<()> {
        self.set(SETTINGS_KEY, document)
    }

    fn load_sync_status(&self) -> Result<PersistedSyncStatus> {
        self.get(SYNC_STATUS_KEY)
    }

    fn save_sync_status(&self, status: &PersistedSyncStatus) -> Result<()> {
        self.set(SYNC_STATUS_KEY, status)
    }
}
