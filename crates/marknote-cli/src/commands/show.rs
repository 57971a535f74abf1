use std::path::Path;

use crate::commands::common::{format_timestamp, open_store, resolve_note};
use crate::error::CliError;

pub async fn run_show(id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let note = resolve_note(id, &store).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&note)?);
        return Ok(());
    }

    println!("# {}", note.title);
    println!();
    println!("id:        {}", note.id);
    println!("workspace: {}", note.workspace);
    println!("created:   {}", format_timestamp(note.created_at));
    println!("updated:   {}", format_timestamp(note.updated_at));
    println!();
    println!("{}", note.content);
    Ok(())
}
