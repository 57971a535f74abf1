//! Data models for Marknote

mod note;
mod settings;
mod sync_status;

pub use note::{
    normalize_title, normalize_user_id, normalize_workspace, Note, NoteId, DEFAULT_TITLE,
    DEFAULT_USER_ID, DEFAULT_WORKSPACE,
};
pub use settings::{
    union_workspaces, AiProvider, SettingKey, Settings, SettingsDocument, ThemeMode,
    DEFAULT_WORKSPACES,
};
pub use sync_status::{PersistedSyncStatus, RemoteStatus, SyncStatus};
