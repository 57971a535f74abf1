//! marknote-api - backend for Marknote cloud sync
//!
//! Serves the `/api` surface the sync gateway talks to: notes, bulk sync,
//! status, and per-user settings, persisted in SQLite.

pub mod config;
pub mod error;
pub mod routes;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::AppError;
pub use routes::{app_router, AppState};
pub use store::ServerStore;
