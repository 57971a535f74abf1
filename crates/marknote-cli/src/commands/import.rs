use std::collections::HashSet;
use std::path::Path;

use marknote_core::export::{parse_backup, plan_import};
use marknote_core::util;

use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_import(path: &Path, db_path: &Path) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(path)?;
    let backup = parse_backup(&raw)?;

    let store = open_store(db_path)?;
    let existing = store
        .list_notes(None)
        .await?
        .into_iter()
        .map(|note| note.id)
        .collect::<HashSet<_>>();
    let current = store.load_settings().await?;

    let mut plan = plan_import(backup, &existing, &current);
    let imported = store.import_notes(&plan.new_notes).await?;
    if plan.document != current {
        plan.document.updated_at = Some(util::now());
        store.save_settings(&plan.document).await?;
    }

    println!("Imported {imported} notes ({} skipped)", plan.skipped);
    Ok(())
}
