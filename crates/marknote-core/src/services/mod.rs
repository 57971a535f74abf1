//! Shared service layer.

mod local_store;

pub use local_store::{LocalStore, MergeOutcome};
