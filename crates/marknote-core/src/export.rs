//! Backup and export helpers.

use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{union_workspaces, Note, NoteId, Settings, SettingsDocument};
use crate::util;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Full backup: notes, workspaces and settings
    Json,
    /// Notes only, one front-matter block each
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Portable backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub workspaces: Vec<String>,
    #[serde(default)]
    pub settings: Option<Settings>,
    pub export_time: DateTime<Utc>,
}

impl Backup {
    /// Snapshot the given notes and settings document.
    ///
    /// The AI API key is left out of the file.
    pub fn new(notes: Vec<Note>, document: &SettingsDocument) -> Self {
        let mut settings = document.settings.clone();
        settings.ai_api_key = None;
        Self {
            notes,
            workspaces: document.workspaces.clone(),
            settings: Some(settings),
            export_time: util::now(),
        }
    }
}

/// What applying a backup to the current state would change.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    /// Notes whose ids are not present yet
    pub new_notes: Vec<Note>,
    /// Number of backup notes skipped because the id already exists
    pub skipped: usize,
    /// Settings document after the import
    pub document: SettingsDocument,
}

/// Work out an import: only unseen note ids are added, workspaces are
/// unioned and imported settings keep this device's cloud fields.
pub fn plan_import(
    backup: Backup,
    existing_ids: &HashSet<NoteId>,
    current: &SettingsDocument,
) -> ImportPlan {
    let mut seen = existing_ids.clone();
    let mut new_notes = Vec::new();
    let mut skipped = 0;
    for note in backup.notes {
        if seen.insert(note.id.clone()) {
            new_notes.push(note);
        } else {
            skipped += 1;
        }
    }

    let mut document = current.clone();
    document.workspaces = union_workspaces(&current.workspaces, &backup.workspaces);
    if let Some(imported) = backup.settings {
        let mut settings = current.settings.with_imported(&imported);
        if settings.ai_api_key.is_none() {
            settings.ai_api_key.clone_from(&current.settings.ai_api_key);
        }
        document.settings = settings;
    }

    ImportPlan {
        new_notes,
        skipped,
        document,
    }
}

/// Render a backup as pretty-printed JSON.
pub fn render_backup_json(backup: &Backup) -> Result<String> {
    Ok(serde_json::to_string_pretty(backup)?)
}

/// Parse a backup file.
///
/// A bare JSON array of notes is accepted as well.
pub fn parse_backup(raw: &str) -> Result<Backup> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.is_array() {
        let notes: Vec<Note> = serde_json::from_value(value)?;
        return Ok(Backup {
            notes,
            workspaces: Vec::new(),
            settings: None,
            export_time: util::now(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

/// Render notes in Markdown with front-matter blocks.
#[must_use]
pub fn render_markdown_export(notes: &[Note]) -> String {
    let mut output = String::new();

    for (index, note) in notes.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }

        let _ = writeln!(output, "---");
        let _ = writeln!(output, "id: {}", note.id);
        let _ = writeln!(output, "title: {}", note.title);
        let _ = writeln!(output, "workspace: {}", note.workspace);
        let _ = writeln!(output, "created_at: {}", note.created_at.to_rfc3339());
        let _ = writeln!(output, "updated_at: {}", note.updated_at.to_rfc3339());
        let _ = writeln!(output, "---");
        let _ = writeln!(output);
        output.push_str(&note.content);
        output.push('\n');
    }

    output
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, at: DateTime<Utc>) -> String {
    format!(
        "marknote-backup-{}.{}",
        at.format("%Y-%m-%d"),
        format.extension()
    )
}
