use std::path::Path;

use marknote_core::config::ClientConfig;

use crate::commands::common::{cloud_orchestrator, open_store, resolve_note};
use crate::error::CliError;

/// With cloud sync on, the note is deleted remotely as well and the local
/// delete is rolled back if the backend refuses. Otherwise a tombstone is
/// left for the next sync.
pub async fn run_delete(id: &str, config: &ClientConfig, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let note = resolve_note(id, &store).await?;

    if let Some(orchestrator) = cloud_orchestrator(&store, config).await? {
        orchestrator.delete_note(&note.id).await?;
    } else {
        store.delete_note(&note.id).await?;
    }

    println!("{}", note.id);
    Ok(())
}
