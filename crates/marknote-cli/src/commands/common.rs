use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use marknote_core::config::ClientConfig;
use marknote_core::models::SyncStatus;
use marknote_core::services::LocalStore;
use marknote_core::sync::{HttpNotesGateway, SyncContext, SyncOrchestrator, SyncReport};
use marknote_core::{Note, NoteId, SettingsDocument};
use serde::Serialize;

use crate::error::CliError;

pub type Orchestrator = SyncOrchestrator<HttpNotesGateway>;

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub workspace: String,
    pub preview: String,
    pub created_at: String,
    pub updated_at: String,
    pub relative_time: String,
}

pub fn open_store(db_path: &Path) -> Result<LocalStore, CliError> {
    Ok(LocalStore::open_path(db_path)?)
}

pub async fn resolve_note(note_query: &str, store: &LocalStore) -> Result<Note, CliError> {
    let note_query = normalize_note_identifier(note_query)?;
    if let Some(note) = store.get_note(&NoteId::from(note_query.as_str())).await? {
        return Ok(note);
    }

    let mut matches = store.find_notes_by_id_prefix(&note_query).await?;
    match matches.len() {
        0 => Err(CliError::NoteNotFound(note_query)),
        1 => Ok(matches.remove(0)),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|note| short_id(&note.id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Server URL and user id, with environment overrides over stored settings.
pub fn sync_target(
    document: &SettingsDocument,
    config: &ClientConfig,
) -> Result<(String, String), CliError> {
    let server_url = config
        .server_url
        .clone()
        .or_else(|| document.settings.server_url.clone())
        .ok_or(CliError::SyncNotConfigured)?;
    let user_id = config
        .user_id
        .clone()
        .unwrap_or_else(|| document.settings.user_id.clone());
    Ok((server_url, user_id))
}

pub async fn build_orchestrator(
    store: LocalStore,
    config: &ClientConfig,
) -> Result<Orchestrator, CliError> {
    let document = store.load_settings().await?;
    let (server_url, user_id) = sync_target(&document, config)?;
    let gateway = HttpNotesGateway::new(server_url, config.http_timeout)?;
    tracing::debug!("Syncing as {user_id} against {}", gateway.base_url());

    Ok(SyncOrchestrator::new(SyncContext {
        store,
        gateway,
        user_id,
        sync_interval: config.sync_interval,
        debounce_window: config.debounce_window,
    })
    .await?)
}

/// Orchestrator for commands that act on the cloud only when sync is on.
pub async fn cloud_orchestrator(
    store: &LocalStore,
    config: &ClientConfig,
) -> Result<Option<Orchestrator>, CliError> {
    let document = store.load_settings().await?;
    if !document.settings.cloud_sync {
        return Ok(None);
    }
    match build_orchestrator(store.clone(), config).await {
        Ok(orchestrator) => Ok(Some(orchestrator)),
        Err(CliError::SyncNotConfigured) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Best-effort push after a local edit.
pub async fn push_if_enabled(store: &LocalStore, config: &ClientConfig) -> Result<(), CliError> {
    if let Some(orchestrator) = cloud_orchestrator(store, config).await? {
        orchestrator.push_silent().await;
    }
    Ok(())
}

/// Print notes as a JSON array or as one aligned line per note.
pub fn print_notes(notes: &[Note], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let items = notes.iter().map(note_to_list_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_note_lines(notes) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now = Utc::now();
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(&note.id);
            let title = truncate(&note.title, 30);
            let relative_time = format_relative_time(note.updated_at, now);
            format!(
                "{short_id:<13}  {title:<30}  {:<10}  {relative_time}",
                note.workspace
            )
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        workspace: note.workspace.clone(),
        preview: note.preview(80),
        created_at: note.created_at.to_rfc3339(),
        updated_at: note.updated_at.to_rfc3339(),
        relative_time: format_relative_time(note.updated_at, Utc::now()),
    }
}

pub fn short_id(id: &NoteId) -> String {
    id.as_str().chars().take(13).collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated = text
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - timestamp).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn format_report(report: &SyncReport) -> String {
    format!(
        "pushed {}, pulled {}, merged {}, remote deletes {}, tombstones pruned {}",
        report.pushed,
        report.pulled,
        report.merged,
        report.remote_deleted,
        report.tombstones_pruned
    )
}

pub fn format_status_line(status: &SyncStatus) -> String {
    let last_sync = status
        .last_sync
        .map_or_else(|| "never".to_string(), format_timestamp);
    let mut line = format!(
        "{:<7}  connected={}  last sync {last_sync}",
        status.state().to_string(),
        status.connected
    );
    if let Some(error) = status.error.as_deref() {
        line.push_str("  error: ");
        line.push_str(error);
    }
    line
}

pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    if let Some(content) = capture_editor_input_with_initial("")? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySearchQuery)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(CliError::EditorFailed("empty EDITOR command".into()));
    };

    let status = Command::new(program).args(parts).arg(file_path).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )))
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("marknote-{}-{now}.md", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("MARKNOTE_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marknote")
        .join("marknote.db")
}
