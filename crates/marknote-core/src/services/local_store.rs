//! Shared local store used by the CLI and the sync orchestrator.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, NoteStore, SqliteNoteStore, SqliteStateRepository, SqliteTombstoneLedger,
    StateRepository, TombstoneLedger,
};
use crate::models::{Note, NoteId, PersistedSyncStatus, SettingsDocument};
use crate::sync::merge_notes;
use crate::{search, Error, Result};

/// Thread-safe handle over the on-device database.
///
/// Every method takes the lock, does its `SQLite` work synchronously and
/// releases it before returning, so callers never hold it across a network
/// await and no reader sees a half-written collection.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

/// Outcome of [`LocalStore::merge_remote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Notes in the store after the merge
    pub notes: Vec<Note>,
    /// Tombstones that were applied
    pub tombstones: HashSet<NoteId>,
}

impl LocalStore {
    /// Open a store at the given filesystem path, creating parent directories.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::open(&db_path)?;
        tracing::debug!("Opened local store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Create a note for the configured user.
    pub async fn create_note(&self, title: &str, content: &str, workspace: &str) -> Result<Note> {
        let db = self.db.lock().await;
        let user_id = SqliteStateRepository::new(db.connection())
            .load_settings()?
            .settings
            .user_id;
        let note = Note::new(title, content, workspace, user_id);
        SqliteNoteStore::new(db.connection()).upsert(&note)?;
        tracing::debug!("Created note {}", note.id);
        Ok(note)
    }

    /// Apply an edit. `updated_at` only moves forward, and only when
    /// something changed.
    pub async fn update_note(
        &self,
        id: &NoteId,
        title: Option<&str>,
        content: Option<&str>,
        workspace: Option<&str>,
    ) -> Result<Note> {
        let db = self.db.lock().await;
        let store = SqliteNoteStore::new(db.connection());
        let mut note = store
            .get(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let mut changed = note.edit(title, content);
        if let Some(workspace) = workspace {
            let workspace = crate::models::normalize_workspace(workspace);
            if workspace != note.workspace {
                note.workspace = workspace;
                note.touch();
                changed = true;
            }
        }

        if changed {
            store.upsert(&note)?;
            tracing::debug!("Updated note {}", note.id);
        }
        Ok(note)
    }

    pub async fn get_note(&self, id: &NoteId) -> Result<Option<Note>> {
        let db = self.db.lock().await;
        SqliteNoteStore::new(db.connection()).get(id)
    }

    /// List notes newest first.
    pub async fn list_notes(&self, workspace: Option<&str>) -> Result<Vec<Note>> {
        let db = self.db.lock().await;
        SqliteNoteStore::new(db.connection()).list(workspace)
    }

    pub async fn search_notes(&self, query: &str, workspace: Option<&str>) -> Result<Vec<Note>> {
        let notes = self.list_notes(workspace).await?;
        Ok(search::filter_notes(notes, query))
    }

    pub async fn find_notes_by_id_prefix(&self, prefix: &str) -> Result<Vec<Note>> {
        let db = self.db.lock().await;
        SqliteNoteStore::new(db.connection()).find_by_id_prefix(prefix)
    }

    /// Remove a note and record its tombstone in one transaction.
    ///
    /// Returns the removed note so a failed remote delete can restore it.
    pub async fn delete_note(&self, id: &NoteId) -> Result<Note> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let store = SqliteNoteStore::new(conn);
        let note = store
            .get(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let tx = conn.unchecked_transaction()?;
        SqliteNoteStore::new(&tx).remove(id)?;
        SqliteTombstoneLedger::new(&tx).record(id)?;
        tx.commit()?;

        tracing::debug!("Deleted note {id} and recorded tombstone");
        Ok(note)
    }

    /// Undo [`Self::delete_note`]: put the note back and drop its tombstone.
    pub async fn restore_note(&self, note: &Note) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let tx = conn.unchecked_transaction()?;
        SqliteNoteStore::new(&tx).upsert(note)?;
        SqliteTombstoneLedger::new(&tx).remove(&note.id)?;
        tx.commit()?;

        tracing::debug!("Restored note {}", note.id);
        Ok(())
    }

    /// Merge a pulled collection into the store.
    ///
    /// Reading local notes and tombstones, merging and writing back all
    /// happen under one lock.
    pub async fn merge_remote(&self, remote: &[Note]) -> Result<MergeOutcome> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let store = SqliteNoteStore::new(conn);
        let tombstones = SqliteTombstoneLedger::new(conn).list()?;
        let local = store.list(None)?;

        let merged = merge_notes(&local, remote, &tombstones);
        store.replace_all(&merged)?;

        Ok(MergeOutcome {
            notes: merged,
            tombstones,
        })
    }

    pub async fn tombstones(&self) -> Result<HashSet<NoteId>> {
        let db = self.db.lock().await;
        SqliteTombstoneLedger::new(db.connection()).list()
    }

    pub async fn record_tombstone(&self, id: &NoteId) -> Result<()> {
        let db = self.db.lock().await;
        SqliteTombstoneLedger::new(db.connection()).record(id)
    }

    /// Drop tombstones whose ids are not in `existing`.
    pub async fn prune_tombstones(&self, existing: &HashSet<NoteId>) -> Result<usize> {
        let db = self.db.lock().await;
        SqliteTombstoneLedger::new(db.connection()).prune(existing)
    }

    pub async fn clear_tombstones(&self) -> Result<usize> {
        let db = self.db.lock().await;
        SqliteTombstoneLedger::new(db.connection()).clear()
    }

    /// Insert notes whose ids are not present yet; returns how many were added.
    pub async fn import_notes(&self, notes: &[Note]) -> Result<usize> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let tx = conn.unchecked_transaction()?;
        let store = SqliteNoteStore::new(&tx);
        let mut added = 0;
        for note in notes {
            if store.get(&note.id)?.is_none() {
                store.upsert(note)?;
                added += 1;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    pub async fn load_settings(&self) -> Result<SettingsDocument> {
        let db = self.db.lock().await;
        SqliteStateRepository::new(db.connection()).load_settings()
    }

    pub async fn save_settings(&self, document: &SettingsDocument) -> Result<()> {
        let db = self.db.lock().await;
        SqliteStateRepository::new(db.connection()).save_settings(document)
    }

    pub async fn load_sync_status(&self) -> Result<PersistedSyncStatus> {
        let db = self.db.lock().await;
        SqliteStateRepository::new(db.connection()).load_sync_status()
    }

    pub async fn save_sync_status(&self, status: &PersistedSyncStatus) -> Result<()> {
        let db = self.db.lock().await;
        SqliteStateRepository::new(db.connection()).save_sync_status(status)
    }
}
