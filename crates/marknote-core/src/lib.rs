//! marknote-core - Core library for Marknote
//!
//! This crate contains the shared models, the local SQLite store, the merge
//! engine, and the cloud sync machinery used by the API server and the CLI.

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod search;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Note, NoteId, Settings, SettingsDocument, SyncStatus};
