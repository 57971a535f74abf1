use std::path::Path;

use marknote_core::config::ClientConfig;

use crate::commands::common::{
    capture_editor_input_with_initial, open_store, push_if_enabled, resolve_note,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<&str>,
    content: Option<&str>,
    workspace: Option<&str>,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let note = resolve_note(id, &store).await?;

    let edited_content;
    let content = if title.is_none() && content.is_none() && workspace.is_none() {
        let Some(from_editor) = capture_editor_input_with_initial(&note.content)? else {
            return Err(CliError::EmptyEditedContent);
        };
        edited_content = from_editor;
        Some(edited_content.as_str())
    } else {
        content
    };

    let updated = store
        .update_note(&note.id, title, content, workspace)
        .await?;
    if updated.updated_at != note.updated_at {
        push_if_enabled(&store, config).await?;
    }

    println!("{}", updated.id);
    Ok(())
}
