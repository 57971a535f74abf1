//! In-process gateway used by the orchestrator tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{Note, NoteId, RemoteStatus, SettingsDocument};
use crate::sync::gateway::NotesGateway;
use crate::util;

/// Backend double with the same upsert rules as the real server, plus
/// failure injection and in-flight accounting.
#[derive(Default)]
pub struct InMemoryGateway {
    notes: Mutex<HashMap<String, BTreeMap<NoteId, Note>>>,
    settings: Mutex<HashMap<String, SettingsDocument>>,
    offline: Mutex<bool>,
    failing_deletes: Mutex<bool>,
    failing_settings: Mutex<bool>,
    latency: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    bulk_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        *lock(&self.offline) = offline;
    }

    pub fn set_failing_deletes(&self, failing: bool) {
        *lock(&self.failing_deletes) = failing;
    }

    pub fn set_failing_settings(&self, failing: bool) {
        *lock(&self.failing_settings) = failing;
    }

    /// Delay every call by `latency` (counted as in flight meanwhile).
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// Put a note straight into the remote store, as another device would.
    pub fn seed(&self, note: Note) {
        lock(&self.notes)
            .entry(note.user_id.clone())
            .or_default()
            .insert(note.id.clone(), note);
    }

    pub fn seed_settings(&self, document: SettingsDocument) {
        lock(&self.settings).insert(document.user_id.clone(), document);
    }

    pub fn remote_notes(&self, user_id: &str) -> Vec<Note> {
        lock(&self.notes)
            .get(user_id)
            .map(|notes| notes.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remote_settings(&self, user_id: &str) -> Option<SettingsDocument> {
        lock(&self.settings).get(user_id).cloned()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<CallGuard<'_>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = CallGuard(&self.in_flight);

        let latency = *lock(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if *lock(&self.offline) {
            return Err(Error::Network("connection refused".into()));
        }
        Ok(guard)
    }

    fn upsert_preserving_newer(&self, note: &Note) -> Note {
        let mut notes = lock(&self.notes);
        let user_notes = notes.entry(note.user_id.clone()).or_default();
        match user_notes.get(&note.id) {
            Some(stored) if stored.updated_at > note.updated_at => stored.clone(),
            _ => {
                user_notes.insert(note.id.clone(), note.clone());
                note.clone()
            }
        }
    }
}

struct CallGuard<'a>(&'a AtomicUsize);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl NotesGateway for InMemoryGateway {
    async fn list_notes(&self, user_id: &str, workspace: Option<&str>) -> Result<Vec<Note>> {
        let _call = self.enter().await?;
        let mut notes: Vec<Note> = self
            .remote_notes(user_id)
            .into_iter()
            .filter(|note| workspace.map_or(true, |workspace| note.workspace == workspace))
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    async fn upsert_note(&self, note: &Note) -> Result<Note> {
        let _call = self.enter().await?;
        let mut note = note.clone();
        note.updated_at = util::next_stamp(note.updated_at);
        Ok(self.upsert_preserving_newer(&note))
    }

    async fn replace_all(&self, user_id: &str, notes: &[Note]) -> Result<Vec<Note>> {
        let _call = self.enter().await?;
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        for note in notes {
            let mut note = note.clone();
            note.user_id = user_id.to_string();
            self.upsert_preserving_newer(&note);
        }
        Ok(self.remote_notes(user_id))
    }

    async fn delete_note(&self, user_id: &str, id: &NoteId) -> Result<()> {
        let _call = self.enter().await?;
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if *lock(&self.failing_deletes) {
            return Err(Error::Server {
                status: 500,
                message: "delete failed".into(),
            });
        }
        let removed = lock(&self.notes)
            .get_mut(user_id)
            .and_then(|notes| notes.remove(id));
        removed
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Note {id} not found")))
    }

    async fn status(&self, user_id: &str) -> Result<RemoteStatus> {
        let _call = self.enter().await?;
        let notes = self.remote_notes(user_id);
        Ok(RemoteStatus {
            connected: true,
            notes_count: notes.len() as u64,
            last_sync: notes.iter().map(|note| note.updated_at).max(),
        })
    }

    async fn health(&self) -> Result<()> {
        let _call = self.enter().await?;
        Ok(())
    }

    async fn fetch_settings(&self, user_id: &str) -> Result<SettingsDocument> {
        let _call = self.enter().await?;
        if *lock(&self.failing_settings) {
            return Err(Error::Server {
                status: 500,
                message: "settings table locked".into(),
            });
        }
        Ok(self.remote_settings(user_id).unwrap_or_else(|| SettingsDocument {
            user_id: user_id.to_string(),
            ..SettingsDocument::default()
        }))
    }

    async fn push_settings(&self, document: &SettingsDocument) -> Result<SettingsDocument> {
        let _call = self.enter().await?;
        self.seed_settings(document.clone());
        Ok(document.clone())
    }
}
