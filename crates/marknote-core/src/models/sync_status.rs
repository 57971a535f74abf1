//! Sync status records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::SyncState;

/// Process-wide view of the sync lifecycle.
///
/// `connected` and `syncing` are rebuilt on every attempt; only the
/// [`PersistedSyncStatus`] half survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub connected: bool,
    pub syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SyncStatus {
    /// Rebuild an idle status from what was persisted last run.
    pub fn restored(persisted: PersistedSyncStatus) -> Self {
        Self {
            connected: false,
            syncing: false,
            last_sync: persisted.last_sync,
            error: persisted.error,
        }
    }

    pub const fn state(&self) -> SyncState {
        if self.syncing {
            SyncState::Syncing
        } else if self.error.is_some() {
            SyncState::Error
        } else {
            SyncState::Idle
        }
    }

    pub fn persisted(&self) -> PersistedSyncStatus {
        PersistedSyncStatus {
            last_sync: self.last_sync,
            error: self.error.clone(),
        }
    }
}

/// The part of [`SyncStatus`] written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSyncStatus {
    pub last_sync: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Answer of the backend's status probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub notes_count: u64,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;

    #[test]
    fn state_follows_flags() {
        let mut status = SyncStatus::default();
        assert_eq!(status.state(), SyncState::Idle);

        status.error = Some("offline".into());
        assert_eq!(status.state(), SyncState::Error);

        status.syncing = true;
        assert_eq!(status.state(), SyncState::Syncing);
    }

    #[test]
    fn restored_status_is_disconnected() {
        let persisted = PersistedSyncStatus {
            last_sync: Some(util::from_millis(42_000)),
            error: Some("boom".into()),
        };
        let status = SyncStatus::restored(persisted.clone());
        assert!(!status.connected);
        assert!(!status.syncing);
        assert_eq!(status.persisted(), persisted);
    }

    #[test]
    fn remote_status_parses_backend_probe() {
        let status: RemoteStatus = serde_json::from_str(
            r#"{"connected":true,"notesCount":3,"lastSync":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(status.connected);
        assert_eq!(status.notes_count, 3);
        assert!(status.last_sync.is_some());
    }
}
