pub mod add;
pub mod ai;
pub mod common;
pub mod completions;
pub mod delete;
pub mod edit;
pub mod export;
pub mod import;
pub mod list;
pub mod search;
pub mod settings;
pub mod show;
pub mod sync;
pub mod tombstones;
pub mod watch;
pub mod workspace;
