use std::path::Path;

use crate::commands::common::{normalize_search_query, open_store, print_notes};
use crate::error::CliError;

pub async fn run_search(
    query: &str,
    workspace: Option<&str>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let query = normalize_search_query(query)?;
    let mut notes = open_store(db_path)?.search_notes(&query, workspace).await?;
    notes.truncate(limit);

    if notes.is_empty() && !as_json {
        println!("No notes match '{query}'.");
        return Ok(());
    }
    print_notes(&notes, as_json)
}
