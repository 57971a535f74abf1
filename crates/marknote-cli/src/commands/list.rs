use std::path::Path;

use crate::commands::common::{open_store, print_notes};
use crate::error::CliError;

pub async fn run_list(
    limit: usize,
    workspace: Option<&str>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let mut notes = open_store(db_path)?.list_notes(workspace).await?;
    notes.truncate(limit);

    if notes.is_empty() && !as_json {
        println!("No notes yet. Capture one with `marknote \"text\"`.");
        return Ok(());
    }
    print_notes(&notes, as_json)
}
