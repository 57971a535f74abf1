//! Sync orchestrator.
//!
//! Owns the sync lifecycle: one round trip at a time, a periodic timer, a
//! debounced push after edits, and explicit user actions. It is the only
//! writer of [`SyncStatus`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;

use crate::config::clamp_sync_interval;
use crate::error::Result;
use crate::models::{Note, NoteId, SettingsDocument, SyncStatus};
use crate::services::LocalStore;
use crate::sync::debounce::Debouncer;
use crate::sync::gateway::{silently, NotesGateway};
use crate::sync::scheduler::{PeriodicTask, TaskState};
use crate::util;

/// Everything an orchestrator needs, passed explicitly.
pub struct SyncContext<G> {
    pub store: LocalStore,
    pub gateway: G,
    pub user_id: String,
    pub sync_interval: Duration,
    pub debounce_window: Duration,
}

/// What caused a sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Timer,
    ContentChanged,
    Visibility,
    NetworkRestored,
    Startup,
}

/// Counts from one completed round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Local notes sent to the backend
    pub pushed: usize,
    /// Notes returned by the pull
    pub pulled: usize,
    /// Notes in the local store after merging
    pub merged: usize,
    /// Tombstoned notes deleted on the backend
    pub remote_deleted: usize,
    /// Tombstones dropped from the ledger
    pub tombstones_pruned: usize,
}

/// Result of a silent (background) sync attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another round trip was already in flight; this trigger was dropped.
    Skipped,
    /// The attempt failed; the message is also recorded in the status.
    Failed(String),
}

struct Inner<G> {
    store: LocalStore,
    gateway: G,
    user_id: String,
    in_flight: AtomicBool,
    status: watch::Sender<SyncStatus>,
    timer: PeriodicTask,
    debouncer: Debouncer,
}

/// Cheap, cloneable handle over the shared sync state.
pub struct SyncOrchestrator<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for SyncOrchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Holds the in-flight flag for the lifetime of one network batch.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<G: NotesGateway> SyncOrchestrator<G> {
    /// Build an orchestrator, restoring the persisted half of the status.
    pub async fn new(context: SyncContext<G>) -> Result<Self> {
        let persisted = context.store.load_sync_status().await?;
        let (status, _) = watch::channel(SyncStatus::restored(persisted));

        Ok(Self {
            inner: Arc::new(Inner {
                store: context.store,
                gateway: context.gateway,
                user_id: context.user_id,
                in_flight: AtomicBool::new(false),
                status,
                timer: PeriodicTask::new(clamp_sync_interval(context.sync_interval)),
                debouncer: Debouncer::new(context.debounce_window),
            }),
        })
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    /// Receive every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    pub fn timer_state(&self) -> TaskState {
        self.inner.timer.state()
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Explicit round trip; failures are returned to the caller.
    ///
    /// Returns `Ok(None)` when another round trip was already in flight.
    pub async fn sync_now(&self) -> Result<Option<SyncReport>> {
        tracing::info!("Manual sync requested");
        self.run_exclusive().await.transpose()
    }

    /// Background round trip; failures are logged and recorded in the status.
    pub async fn trigger(&self, trigger: SyncTrigger) -> SyncOutcome {
        tracing::debug!("Sync triggered by {trigger:?}");
        match self.run_exclusive().await {
            None => SyncOutcome::Skipped,
            Some(Ok(report)) => SyncOutcome::Completed(report),
            Some(Err(error)) => {
                tracing::warn!("Background sync ({trigger:?}) failed: {error}");
                SyncOutcome::Failed(error.to_string())
            }
        }
    }

    /// Push local notes without pulling; failures are only logged.
    pub async fn push_silent(&self) -> SyncOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight) else {
            tracing::debug!("Push skipped: a sync is already in flight");
            return SyncOutcome::Skipped;
        };
        self.inner.status.send_modify(|status| status.syncing = true);

        let result = self.push_local().await;
        self.finish(&result).await;
        match result {
            Ok(report) => SyncOutcome::Completed(report),
            Err(error) => {
                tracing::warn!("Background push failed: {error}");
                SyncOutcome::Failed(error.to_string())
            }
        }
    }

    /// Start the periodic timer.
    pub fn start(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.timer.start(move || {
            let weak = Weak::clone(&weak);
            async move {
                if let Some(inner) = weak.upgrade() {
                    Self { inner }.trigger(SyncTrigger::Timer).await;
                }
            }
        });
        tracing::info!(
            "Periodic sync started every {:?}",
            self.inner.timer.period()
        );
    }

    /// Pause the timer, returning whether it was running.
    pub fn pause(&self) -> bool {
        self.inner.timer.pause()
    }

    pub fn resume(&self) {
        self.inner.timer.resume();
    }

    /// Stop the timer and drop any pending debounced push.
    pub fn stop(&self) {
        self.inner.timer.stop();
        self.inner.debouncer.cancel();
    }

    /// Schedule a push once edits settle for the debounce window.
    pub fn notify_content_changed(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(move || async move {
            if let Some(inner) = weak.upgrade() {
                Self { inner }.push_silent().await;
            }
        });
    }

    /// Delete a note locally and remotely.
    ///
    /// The timer is paused for the duration so a concurrent pull cannot
    /// resurrect the note. If the backend rejects the delete, the note and
    /// its tombstone are rolled back and the error is returned. An already
    /// missing remote note counts as success.
    pub async fn delete_note(&self, id: &NoteId) -> Result<Note> {
        let was_running = self.inner.timer.pause();
        let result = self.delete_everywhere(id).await;
        if was_running {
            self.inner.timer.resume();
        }
        result
    }

    async fn delete_everywhere(&self, id: &NoteId) -> Result<Note> {
        let note = self.inner.store.delete_note(id).await?;

        match self.inner.gateway.delete_note(&self.inner.user_id, id).await {
            Ok(()) => {
                tracing::info!("Deleted note {id} locally and remotely");
                Ok(note)
            }
            Err(error) if error.is_not_found() => {
                tracing::debug!("Note {id} was already absent remotely");
                Ok(note)
            }
            Err(error) => {
                tracing::warn!("Remote delete of {id} failed, restoring note: {error}");
                if let Err(restore_error) = self.inner.store.restore_note(&note).await {
                    tracing::error!("Failed to restore note {id}: {restore_error}");
                }
                Err(error)
            }
        }
    }

    /// Turn cloud sync on and run a first round trip. The flag is reverted
    /// when that round trip fails.
    pub async fn enable_cloud_sync(&self) -> Result<SyncReport> {
        self.set_cloud_sync(true).await?;

        match self.sync_now().await {
            Ok(report) => Ok(report.unwrap_or_default()),
            Err(error) => {
                tracing::warn!("Enabling cloud sync failed, reverting: {error}");
                if let Err(revert_error) = self.set_cloud_sync(false).await {
                    tracing::error!("Failed to revert cloud sync flag: {revert_error}");
                }
                Err(error)
            }
        }
    }

    pub async fn disable_cloud_sync(&self) -> Result<()> {
        self.stop();
        self.set_cloud_sync(false).await
    }

    async fn set_cloud_sync(&self, enabled: bool) -> Result<()> {
        let mut document = self.inner.store.load_settings().await?;
        document.settings.cloud_sync = enabled;
        self.inner.store.save_settings(&document).await
    }

    async fn run_exclusive(&self) -> Option<Result<SyncReport>> {
        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight) else {
            tracing::debug!("Sync skipped: a round trip is already in flight");
            return None;
        };

        self.inner.status.send_modify(|status| status.syncing = true);
        let result = self.round_trip().await;
        self.finish(&result).await;
        Some(result)
    }

    async fn push_local(&self) -> Result<SyncReport> {
        let local = self.inner.store.list_notes(None).await?;
        self.inner
            .gateway
            .replace_all(&self.inner.user_id, &local)
            .await?;
        tracing::debug!("Pushed {} notes", local.len());
        Ok(SyncReport {
            pushed: local.len(),
            ..SyncReport::default()
        })
    }

    /// push -> pull -> merge -> propagate tombstones -> prune -> settings
    async fn round_trip(&self) -> Result<SyncReport> {
        let store = &self.inner.store;
        let gateway = &self.inner.gateway;
        let user_id = self.inner.user_id.as_str();

        let local = store.list_notes(None).await?;
        gateway.replace_all(user_id, &local).await?;

        let remote = gateway.list_notes(user_id, None).await?;
        let outcome = store.merge_remote(&remote).await?;

        let remote_ids: HashSet<&NoteId> = remote.iter().map(|note| &note.id).collect();
        let mut undeleted = HashSet::new();
        let mut remote_deleted = 0;
        for id in outcome.tombstones.iter().filter(|id| remote_ids.contains(id)) {
            match gateway.delete_note(user_id, id).await {
                Ok(()) => remote_deleted += 1,
                Err(error) if error.is_not_found() => {}
                Err(error) => {
                    tracing::warn!("Could not delete tombstoned note {id} remotely: {error}");
                    undeleted.insert(id.clone());
                }
            }
        }

        let mut referenced: HashSet<NoteId> =
            outcome.notes.iter().map(|note| note.id.clone()).collect();
        referenced.extend(undeleted);
        let tombstones_pruned = store.prune_tombstones(&referenced).await?;

        silently("Settings sync", self.sync_settings()).await;

        let report = SyncReport {
            pushed: local.len(),
            pulled: remote.len(),
            merged: outcome.notes.len(),
            remote_deleted,
            tombstones_pruned,
        };
        tracing::info!(
            "Sync complete: pushed {}, pulled {}, merged {}, remote deletes {}, tombstones pruned {}",
            report.pushed,
            report.pulled,
            report.merged,
            report.remote_deleted,
            report.tombstones_pruned
        );
        Ok(report)
    }

    /// Last-write-wins on the whole settings document, with field-level
    /// rules applied when the remote copy wins.
    async fn sync_settings(&self) -> Result<()> {
        let store = &self.inner.store;
        let local = store.load_settings().await?;
        let remote = self.inner.gateway.fetch_settings(&self.inner.user_id).await?;

        let local_is_newer = match (local.updated_at, remote.updated_at) {
            (Some(local_at), Some(remote_at)) => local_at > remote_at,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if local_is_newer {
            let outgoing = SettingsDocument {
                user_id: self.inner.user_id.clone(),
                ..local
            };
            self.inner.gateway.push_settings(&outgoing).await?;
            tracing::debug!("Pushed local settings");
        } else {
            let merged = local.merged_with_remote(&remote);
            if merged != local {
                store.save_settings(&merged).await?;
                tracing::debug!("Applied remote settings");
            }
        }
        Ok(())
    }

    async fn finish(&self, result: &Result<SyncReport>) {
        self.inner.status.send_modify(|status| {
            status.syncing = false;
            match result {
                Ok(_) => {
                    status.connected = true;
                    status.last_sync = Some(util::now());
                    status.error = None;
                }
                Err(error) => {
                    status.connected = !error.is_network();
                    status.error = Some(error.to_string());
                }
            }
        });

        let persisted = self.inner.status.borrow().persisted();
        if let Err(error) = self.inner.store.save_sync_status(&persisted).await {
            tracing::warn!("Failed to persist sync status: {error}");
        }
    }
}
