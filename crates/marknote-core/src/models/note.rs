//! Note model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::util;

/// Title shown for notes saved without one.
pub const DEFAULT_TITLE: &str = "Untitled";
/// Workspace tag used when none is given.
pub const DEFAULT_WORKSPACE: &str = "public";
/// Owner used when no identity is configured.
pub const DEFAULT_USER_ID: &str = "default";

/// Opaque, stable note identifier.
///
/// Freshly created notes get a UUID v7 string, but identifiers coming from
/// other devices or older backups are accepted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Create a new unique note ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("note id must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A note in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier, immutable after creation
    pub id: NoteId,
    /// Display title
    #[serde(default = "default_title")]
    pub title: String,
    /// Markdown body
    #[serde(default)]
    pub content: String,
    /// Partition tag
    #[serde(default = "default_workspace")]
    pub workspace: String,
    /// Set once at creation
    pub created_at: DateTime<Utc>,
    /// Advanced on every mutation; the merge tie-breaker
    pub updated_at: DateTime<Utc>,
    /// Owning user
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_workspace() -> String {
    DEFAULT_WORKSPACE.to_string()
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

impl Note {
    /// Create a new note stamped with the current time
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        workspace: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let now = util::now();
        Self {
            id: NoteId::new(),
            title: normalize_title(&title.into()),
            content: content.into(),
            workspace: normalize_workspace(&workspace.into()),
            created_at: now,
            updated_at: now,
            user_id: normalize_user_id(&user_id.into()),
        }
    }

    /// Stamp a local edit. `updated_at` always moves forward, even when the
    /// stored stamp came from a clock running ahead of ours.
    pub fn touch(&mut self) {
        self.updated_at = util::next_stamp(self.updated_at);
    }

    /// Replace title and/or content, bumping `updated_at` when anything changed.
    ///
    /// Returns `true` if the note was modified.
    pub fn edit(&mut self, title: Option<&str>, content: Option<&str>) -> bool {
        let mut changed = false;
        if let Some(title) = title {
            let title = normalize_title(title);
            if title != self.title {
                self.title = title;
                changed = true;
            }
        }
        if let Some(content) = content {
            if content != self.content {
                self.content = content.to_string();
                changed = true;
            }
        }
        if changed {
            self.touch();
        }
        changed
    }

    /// First non-empty content line, truncated to `max_len` characters
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }

    /// Check if note content is empty (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Trimmed title, falling back to the placeholder when empty.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

#[must_use]
pub fn normalize_workspace(workspace: &str) -> String {
    let trimmed = workspace.trim();
    if trimmed.is_empty() {
        DEFAULT_WORKSPACE.to_string()
    } else {
        trimmed.to_string()
    }
}

#[must_use]
pub fn normalize_user_id(user_id: &str) -> String {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        DEFAULT_USER_ID.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_note_id_unique() {
        let id1 = NoteId::new();
        let id2 = NoteId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_note_id_parse_rejects_blank() {
        assert!("   ".parse::<NoteId>().is_err());
        let parsed: NoteId = " 1700000000000 ".parse().unwrap();
        assert_eq!(parsed.as_str(), "1700000000000");
    }

    #[test]
    fn test_note_new_applies_defaults() {
        let note = Note::new("  ", "Hello world", "", "");
        assert_eq!(note.title, DEFAULT_TITLE);
        assert_eq!(note.workspace, DEFAULT_WORKSPACE);
        assert_eq!(note.user_id, DEFAULT_USER_ID);
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn test_touch_moves_past_a_future_stamp() {
        let mut note = Note::new("t", "c", "public", "u");
        let future = note.updated_at + chrono::Duration::days(1);
        note.updated_at = future;
        note.touch();
        assert_eq!(note.updated_at, future + chrono::Duration::milliseconds(1));
    }

    #[test]
    fn test_touch_twice_in_one_millisecond_still_advances() {
        let mut note = Note::new("t", "c", "public", "u");
        let first = note.updated_at;
        note.touch();
        note.touch();
        assert!(note.updated_at >= first + chrono::Duration::milliseconds(2));
    }

    #[test]
    fn test_edit_reports_changes() {
        let mut note = Note::new("Title", "Body", "public", "u");
        assert!(!note.edit(Some("Title"), Some("Body")));
        assert!(note.edit(None, Some("New body")));
        assert_eq!(note.content, "New body");
        assert!(note.edit(Some(""), None));
        assert_eq!(note.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_preview_skips_blank_lines() {
        let note = Note::new("t", "\n\n  First line\nSecond", "public", "u");
        assert_eq!(note.preview(50), "First line");
        assert_eq!(note.preview(5), "First");
    }

    #[test]
    fn test_json_shape_is_camel_case() {
        let note = Note {
            id: NoteId::from("a"),
            title: "T".into(),
            content: String::new(),
            workspace: "public".into(),
            created_at: util::from_millis(1_000),
            updated_at: util::from_millis(2_000),
            user_id: "u1".into(),
        };
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["userId"], "u1");
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_deserialize_tolerates_backend_extras_and_missing_defaults() {
        let payload = r#"{
            "_id": "65f0c0ffee",
            "__v": 0,
            "id": "1700000000000",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-02T00:00:00.000Z"
        }"#;
        let note: Note = serde_json::from_str(payload).unwrap();
        assert_eq!(note.title, DEFAULT_TITLE);
        assert_eq!(note.workspace, DEFAULT_WORKSPACE);
        assert_eq!(note.user_id, DEFAULT_USER_ID);
        assert!(note.content.is_empty());
    }
}
