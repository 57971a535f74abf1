use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] marknote_core::Error),
    #[error(transparent)]
    Config(#[from] marknote_core::config::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Edited note content cannot be empty")]
    EmptyEditedContent,
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error(
        "Sync is not configured. Run `marknote sync enable --server-url <URL>` or set MARKNOTE_SERVER_URL."
    )]
    SyncNotConfigured,
    #[error("Cloud sync is turned off. Run `marknote sync enable` first.")]
    SyncDisabled,
    #[error("AI features are turned off. Run `marknote settings set ai-enabled true`.")]
    AiDisabled,
    #[error("No @chat or @writer line with a prompt found in note {0}")]
    NoAiTrigger(String),
}
