use std::path::Path;

use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_tombstones_list(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let mut ids = store.tombstones().await?.into_iter().collect::<Vec<_>>();
    ids.sort();

    if ids.is_empty() {
        println!("No pending deletions.");
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

pub async fn run_tombstones_clear(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let cleared = store.clear_tombstones().await?;
    println!("Cleared {cleared} pending deletions");
    Ok(())
}
