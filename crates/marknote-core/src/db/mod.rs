//! Database layer for Marknote

mod connection;
mod migrations;
mod note_store;
mod state_repository;
mod tombstones;

pub use connection::Database;
pub use note_store::{NoteStore, SqliteNoteStore};
pub use state_repository::{SqliteStateRepository, StateRepository};
pub use tombstones::{SqliteTombstoneLedger, TombstoneLedger};
