use std::path::Path;

use marknote_core::util;

use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_workspace_list(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let document = store.load_settings().await?;
    let notes = store.list_notes(None).await?;

    for workspace in &document.workspaces {
        let count = notes
            .iter()
            .filter(|note| &note.workspace == workspace)
            .count();
        println!("{workspace:<20} {count} notes");
    }
    Ok(())
}

pub async fn run_workspace_add(name: &str, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let mut document = store.load_settings().await?;

    if document.add_workspace(name)? {
        document.updated_at = Some(util::now());
        store.save_settings(&document).await?;
        println!("Added workspace {}", name.trim());
    } else {
        println!("Workspace {} already exists", name.trim());
    }
    Ok(())
}
