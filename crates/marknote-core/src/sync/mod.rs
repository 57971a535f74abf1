//! Offline-first note synchronization.
//!
//! The merge engine is a pure function; the orchestrator drives it through a
//! [`NotesGateway`] against the local store.

mod debounce;
mod gateway;
#[cfg(test)]
mod memory;
mod merge;
mod orchestrator;
mod scheduler;

pub use debounce::Debouncer;
pub use gateway::{silently, HttpNotesGateway, NotesGateway};
pub use merge::merge_notes;
pub use orchestrator::{SyncContext, SyncOrchestrator, SyncOutcome, SyncReport, SyncTrigger};
pub use scheduler::{PeriodicTask, TaskState};
