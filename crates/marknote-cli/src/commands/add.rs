use std::path::Path;

use marknote_core::config::ClientConfig;

use crate::commands::common::{open_store, push_if_enabled, resolve_note_content};
use crate::error::CliError;

pub async fn run_add(
    content_parts: &[String],
    title: Option<&str>,
    workspace: &str,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let content = resolve_note_content(content_parts)?;

    let store = open_store(db_path)?;
    let note = store
        .create_note(title.unwrap_or_default(), &content, workspace)
        .await?;
    push_if_enabled(&store, config).await?;

    println!("{}", note.id);
    Ok(())
}
