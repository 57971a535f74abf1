use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use marknote_core::config::ClientConfig;
use marknote_core::export::{parse_backup, ExportFormat as BackupFormat};
use marknote_core::models::{Note, NoteId, SettingKey};
use marknote_core::services::LocalStore;
use marknote_core::util::{from_millis, now};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::cli::{CompletionShell, ExportFormat};
use crate::commands::ai::run_ai_trigger;
use crate::commands::common::{
    default_editor, format_relative_time, format_report, format_status_line, normalize_content,
    normalize_note_identifier, normalize_search_query, resolve_note, truncate,
};
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::export::{export_target, run_export};
use crate::commands::import::run_import;
use crate::commands::settings::{format_settings_lines, run_settings_set};
use crate::commands::sync::{run_sync, run_sync_enable};
use crate::commands::workspace::run_workspace_add;
use crate::error::CliError;

fn test_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("marknote.db");
    (dir, path)
}

fn note_with_id(id: &str, title: &str) -> Note {
    Note {
        id: NoteId::from(id),
        title: title.to_string(),
        content: format!("{title} body"),
        workspace: "public".into(),
        created_at: from_millis(1_000),
        updated_at: from_millis(2_000),
        user_id: "default".into(),
    }
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_content_keeps_multiline_text() {
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn blank_identifiers_and_queries_are_rejected() {
    assert!(matches!(
        normalize_note_identifier("   "),
        Err(CliError::EmptyNoteId)
    ));
    assert!(matches!(
        normalize_search_query(""),
        Err(CliError::EmptySearchQuery)
    ));
    assert_eq!(normalize_search_query(" milk ").unwrap(), "milk");
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn format_relative_time_units() {
    let now = now();
    assert_eq!(
        format_relative_time(now - Duration::seconds(30), now),
        "just now"
    );
    assert_eq!(format_relative_time(now - Duration::minutes(2), now), "2m ago");
    assert_eq!(format_relative_time(now - Duration::hours(2), now), "2h ago");
    assert_eq!(format_relative_time(now + Duration::hours(1), now), "just now");
}

#[test]
fn truncate_adds_ellipsis() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(
        truncate("This is a very long sentence that should be shortened", 20),
        "This is a very lo..."
    );
}

#[test]
fn report_and_status_lines_include_key_fields() {
    let report = marknote_core::sync::SyncReport {
        pushed: 3,
        pulled: 4,
        merged: 4,
        remote_deleted: 1,
        tombstones_pruned: 1,
    };
    assert_eq!(
        format_report(&report),
        "pushed 3, pulled 4, merged 4, remote deletes 1, tombstones pruned 1"
    );

    let status = marknote_core::SyncStatus {
        connected: false,
        syncing: false,
        last_sync: Some(from_millis(0)),
        error: Some("Network error: refused".into()),
    };
    let line = format_status_line(&status);
    assert!(line.contains("1970-01-01 00:00:00 UTC"));
    assert!(line.contains("error: Network error: refused"));
}

#[test]
fn settings_lines_cover_every_key() {
    let lines = format_settings_lines(&marknote_core::Settings::default());
    assert_eq!(lines.len(), SettingKey::ALL.len());
    assert!(lines.iter().any(|line| line.starts_with("font-size") && line.ends_with("14")));
}

#[tokio::test]
async fn resolve_note_accepts_unique_prefix_only() {
    let (_dir, db_path) = test_db();
    let store = LocalStore::open_path(&db_path).unwrap();
    store
        .import_notes(&[
            note_with_id("abc-111", "First"),
            note_with_id("abc-222", "Second"),
            note_with_id("xyz-333", "Third"),
        ])
        .await
        .unwrap();

    assert_eq!(resolve_note("xyz", &store).await.unwrap().title, "Third");
    assert_eq!(resolve_note("abc-222", &store).await.unwrap().title, "Second");
    assert!(matches!(
        resolve_note("abc", &store).await,
        Err(CliError::AmbiguousNoteId(_))
    ));
    assert!(matches!(
        resolve_note("nope", &store).await,
        Err(CliError::NoteNotFound(_))
    ));
}

#[tokio::test]
async fn delete_without_cloud_sync_leaves_tombstone() {
    let (_dir, db_path) = test_db();
    let store = LocalStore::open_path(&db_path).unwrap();
    store
        .import_notes(&[note_with_id("abc-111", "First")])
        .await
        .unwrap();

    run_delete("abc", &ClientConfig::default(), &db_path)
        .await
        .unwrap();

    assert!(store.list_notes(None).await.unwrap().is_empty());
    let tombstones = store.tombstones().await.unwrap();
    assert!(tombstones.contains(&NoteId::from("abc-111")));
}

#[tokio::test]
async fn sync_requires_cloud_sync_and_server() {
    let (_dir, db_path) = test_db();
    let config = ClientConfig::default();

    assert!(matches!(
        run_sync(&config, &db_path).await,
        Err(CliError::SyncDisabled)
    ));
    assert!(matches!(
        run_sync_enable(None, &config, &db_path).await,
        Err(CliError::SyncNotConfigured)
    ));

    let store = LocalStore::open_path(&db_path).unwrap();
    let document = store.load_settings().await.unwrap();
    assert!(!document.settings.cloud_sync);
}

#[tokio::test]
async fn enable_sync_pushes_local_notes_to_backend() {
    let state = marknote_api::AppState::new(
        Arc::new(marknote_api::AppConfig::default()),
        marknote_api::ServerStore::open_in_memory().unwrap(),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, marknote_api::app_router(state))
            .await
            .unwrap();
    });

    let (_dir, db_path) = test_db();
    let store = LocalStore::open_path(&db_path).unwrap();
    store
        .create_note("Synced", "hello", "public")
        .await
        .unwrap();

    run_sync_enable(
        Some(&format!("http://{addr}/")),
        &ClientConfig::default(),
        &db_path,
    )
    .await
    .unwrap();

    let document = store.load_settings().await.unwrap();
    assert!(document.settings.cloud_sync);
    assert!(document.settings.user_id.starts_with("user_"));
    assert_eq!(
        document.settings.server_url.as_deref(),
        Some(format!("http://{addr}").as_str())
    );

    let remote: Vec<Note> = reqwest::get(format!(
        "http://{addr}/api/notes?userId={}",
        document.settings.user_id
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].title, "Synced");

    let status = store.load_sync_status().await.unwrap();
    assert!(status.last_sync.is_some());
    assert!(status.error.is_none());
}

#[tokio::test]
async fn settings_set_validates_and_stamps_document() {
    let (_dir, db_path) = test_db();

    run_settings_set("font_size", "16", &db_path).await.unwrap();
    let error = run_settings_set("font-size", "99", &db_path)
        .await
        .unwrap_err();
    assert!(error.to_string().contains("font-size"));
    assert!(run_settings_set("colour", "red", &db_path).await.is_err());

    let store = LocalStore::open_path(&db_path).unwrap();
    let document = store.load_settings().await.unwrap();
    assert_eq!(document.settings.font_size, 16);
    assert!(document.updated_at.is_some());
}

#[tokio::test]
async fn workspace_add_is_idempotent() {
    let (_dir, db_path) = test_db();
    run_workspace_add("work", &db_path).await.unwrap();
    run_workspace_add(" work ", &db_path).await.unwrap();

    let store = LocalStore::open_path(&db_path).unwrap();
    let document = store.load_settings().await.unwrap();
    assert_eq!(document.workspaces, vec!["public", "private", "work"]);
}

#[tokio::test]
async fn export_then_import_skips_existing_notes() {
    let (dir, db_path) = test_db();
    let store = LocalStore::open_path(&db_path).unwrap();
    store
        .import_notes(&[note_with_id("n-1", "Kept")])
        .await
        .unwrap();
    run_settings_set("ai-api-key", "sk-secret", &db_path)
        .await
        .unwrap();

    let backup_path = dir.path().join("backup.json");
    run_export(ExportFormat::Json, Some(&backup_path), &db_path)
        .await
        .unwrap();
    let exported = std::fs::read_to_string(&backup_path).unwrap();
    assert!(!exported.contains("sk-secret"));
    assert_eq!(parse_backup(&exported).unwrap().notes.len(), 1);

    let (_other_dir, other_db) = test_db();
    let other = LocalStore::open_path(&other_db).unwrap();
    other
        .import_notes(&[note_with_id("n-1", "Local copy")])
        .await
        .unwrap();
    let mut backup = parse_backup(&exported).unwrap();
    backup.notes.push(note_with_id("n-2", "New"));
    std::fs::write(
        &backup_path,
        marknote_core::export::render_backup_json(&backup).unwrap(),
    )
    .unwrap();

    run_import(&backup_path, &other_db).await.unwrap();
    let notes = other.list_notes(None).await.unwrap();
    assert_eq!(notes.len(), 2);
    let kept = other.get_note(&NoteId::from("n-1")).await.unwrap().unwrap();
    assert_eq!(kept.title, "Local copy");
}

#[test]
fn export_into_directory_uses_dated_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let target = export_target(dir.path(), BackupFormat::Markdown);
    let name = target.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("marknote-backup-"));
    assert!(name.ends_with(".md"));

    let file = dir.path().join("notes.md");
    assert_eq!(export_target(&file, BackupFormat::Markdown), file);
}

#[tokio::test]
async fn ai_run_needs_a_trigger_line() {
    let (_dir, db_path) = test_db();
    let store = LocalStore::open_path(&db_path).unwrap();
    store
        .import_notes(&[note_with_id("n-1", "Plain")])
        .await
        .unwrap();

    let error = run_ai_trigger("n-1", &ClientConfig::default(), &db_path)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::NoAiTrigger(_)));
}

#[test]
fn run_completions_writes_bash_script_file() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("marknote.bash");

    run_completions(CompletionShell::Bash, Some(&output_path)).unwrap();

    let script = std::fs::read_to_string(&output_path).unwrap();
    assert!(script.contains("_marknote()"));
    assert!(script.contains("complete -F _marknote"));
}
