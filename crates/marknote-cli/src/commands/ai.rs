use std::io::{self, Write};
use std::path::Path;

use marknote_core::ai::{detect_trigger, insert_reply, AiClient, AiTask};
use marknote_core::config::ClientConfig;
use marknote_core::services::LocalStore;

use crate::commands::common::{open_store, push_if_enabled, resolve_note};
use crate::error::CliError;

async fn ai_client(store: &LocalStore, config: &ClientConfig) -> Result<AiClient, CliError> {
    let document = store.load_settings().await?;
    if !document.settings.ai_enabled {
        return Err(CliError::AiDisabled);
    }
    let client = AiClient::from_settings(&document.settings, config.http_timeout)?;
    tracing::debug!("Using {} model {}", client.provider(), client.model());
    Ok(client)
}

/// Run `task` over a note and print the reply. With `apply`, the reply
/// replaces the note content.
pub async fn run_ai_task(
    id: &str,
    task: AiTask,
    apply: bool,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let note = resolve_note(id, &store).await?;
    let client = ai_client(&store, config).await?;

    let reply = client.run(&task, &note.content).await?;
    println!("{}", reply.trim());

    if apply {
        store
            .update_note(&note.id, None, Some(reply.trim()), None)
            .await?;
        push_if_enabled(&store, config).await?;
    }
    Ok(())
}

pub async fn run_ai_chat(
    prompt_parts: &[String],
    stream: bool,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let prompt = prompt_parts.join(" ");
    if prompt.trim().is_empty() {
        return Err(CliError::EmptyContent);
    }

    let store = open_store(db_path)?;
    let client = ai_client(&store, config).await?;
    let messages = AiTask::Chat.messages(prompt.trim());

    if stream {
        let mut stdout = io::stdout();
        client
            .complete_stream(&messages, |chunk| {
                let _ = stdout.write_all(chunk.as_bytes());
                let _ = stdout.flush();
            })
            .await?;
        println!();
    } else {
        println!("{}", client.complete(&messages).await?.trim());
    }
    Ok(())
}

/// Answer the last `@chat` / `@writer` line of a note in place.
pub async fn run_ai_trigger(id: &str, config: &ClientConfig, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let note = resolve_note(id, &store).await?;
    let trigger = detect_trigger(&note.content, None)
        .ok_or_else(|| CliError::NoAiTrigger(note.id.to_string()))?;

    let client = ai_client(&store, config).await?;
    let reply = client.run(&trigger.kind.task(), &trigger.prompt).await?;
    let content = insert_reply(&note.content, &trigger, &reply);

    store
        .update_note(&note.id, None, Some(&content), None)
        .await?;
    push_if_enabled(&store, config).await?;

    println!("{}", note.id);
    Ok(())
}
