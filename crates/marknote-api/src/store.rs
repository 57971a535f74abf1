//! SQLite persistence for the backend.
//!
//! Notes are keyed by `(user_id, id)` so two users can hold the same note id.
//! Settings documents are stored as JSON blobs, one per user.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use marknote_core::models::{
    normalize_title, normalize_workspace, Note, NoteId, RemoteStatus, SettingsDocument,
};
use marknote_core::util::{from_millis, next_stamp, now};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use crate::error::AppError;

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS notes (
        user_id TEXT NOT NULL,
        id TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        workspace TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, id)
    );
    CREATE INDEX IF NOT EXISTS idx_notes_user_updated ON notes(user_id, updated_at DESC);

    CREATE TABLE IF NOT EXISTS settings (
        user_id TEXT PRIMARY KEY,
        document TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sync_runs (
        user_id TEXT PRIMARY KEY,
        last_sync INTEGER NOT NULL
    );
";

const NOTE_COLUMNS: &str = "id, title, content, workspace, created_at, updated_at, user_id";

/// Fields accepted by the single-note upsert.
#[derive(Debug, Clone)]
pub struct NoteInput {
    pub id: NoteId,
    pub title: Option<String>,
    pub content: Option<String>,
    pub workspace: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

pub struct ServerStore {
    conn: Mutex<Connection>,
}

impl ServerStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;
        // WAL is unavailable on some filesystems; the default journal works too.
        let _ = conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()));
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Notes of `user_id`, newest first.
    pub async fn list_notes(
        &self,
        user_id: &str,
        workspace: Option<&str>,
    ) -> Result<Vec<Note>, AppError> {
        let conn = self.conn.lock().await;
        Ok(select_notes(&conn, user_id, workspace)?)
    }

    /// Insert or update one note, stamping `updated_at` with the server clock.
    /// An existing note keeps its `created_at`.
    pub async fn upsert_note(&self, user_id: &str, input: NoteInput) -> Result<Note, AppError> {
        let conn = self.conn.lock().await;
        let existing = select_note(&conn, user_id, &input.id)?;

        let stamp = now();
        let note = match existing {
            Some(mut note) => {
                if let Some(title) = input.title {
                    note.title = normalize_title(&title);
                }
                if let Some(content) = input.content {
                    note.content = content;
                }
                if let Some(workspace) = input.workspace {
                    note.workspace = normalize_workspace(&workspace);
                }
                note.updated_at = next_stamp(note.updated_at);
                note
            }
            None => Note {
                id: input.id,
                title: normalize_title(input.title.as_deref().unwrap_or_default()),
                content: input.content.unwrap_or_default(),
                workspace: normalize_workspace(input.workspace.as_deref().unwrap_or_default()),
                created_at: input.created_at.unwrap_or(stamp),
                updated_at: stamp,
                user_id: user_id.to_string(),
            },
        };
        write_note(&conn, user_id, &note)?;
        Ok(note)
    }

    /// Delete one note, returning it when it existed.
    pub async fn delete_note(&self, user_id: &str, id: &NoteId) -> Result<Option<Note>, AppError> {
        let conn = self.conn.lock().await;
        let Some(note) = select_note(&conn, user_id, id)? else {
            return Ok(None);
        };
        conn.execute(
            "DELETE FROM notes WHERE user_id = ?1 AND id = ?2",
            params![user_id, id.as_str()],
        )?;
        Ok(Some(note))
    }

    /// Bulk upsert that keeps client timestamps unless the stored copy is
    /// strictly newer. With `prune`, notes missing from `notes` are deleted.
    /// Returns every note the user now has.
    pub async fn bulk_sync(
        &self,
        user_id: &str,
        notes: Vec<Note>,
        prune: bool,
    ) -> Result<Vec<Note>, AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let mut incoming = HashSet::with_capacity(notes.len());
        for mut note in notes {
            incoming.insert(note.id.clone());
            let stored_updated_at: Option<i64> = tx
                .query_row(
                    "SELECT updated_at FROM notes WHERE user_id = ?1 AND id = ?2",
                    params![user_id, note.id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if stored_updated_at.is_some_and(|stored| stored > note.updated_at.timestamp_millis())
            {
                continue;
            }
            user_id.clone_into(&mut note.user_id);
            write_note(&tx, user_id, &note)?;
        }

        let mut pruned = 0_usize;
        if prune {
            let stored = select_notes(&tx, user_id, None)?;
            for note in stored.iter().filter(|note| !incoming.contains(&note.id)) {
                pruned += tx.execute(
                    "DELETE FROM notes WHERE user_id = ?1 AND id = ?2",
                    params![user_id, note.id.as_str()],
                )?;
            }
        }

        tx.execute(
            "INSERT INTO sync_runs (user_id, last_sync) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET last_sync = excluded.last_sync",
            params![user_id, now().timestamp_millis()],
        )?;
        let merged = select_notes(&tx, user_id, None)?;
        tx.commit()?;

        tracing::debug!(
            "Bulk sync for {user_id}: {} incoming, {pruned} pruned, {} stored",
            incoming.len(),
            merged.len()
        );
        Ok(merged)
    }

    pub async fn status(&self, user_id: &str) -> Result<RemoteStatus, AppError> {
        let conn = self.conn.lock().await;
        let notes_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        let last_sync: Option<i64> = conn
            .query_row(
                "SELECT last_sync FROM sync_runs WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(RemoteStatus {
            connected: true,
            notes_count: u64::try_from(notes_count).unwrap_or_default(),
            last_sync: last_sync.map(from_millis),
        })
    }

    /// Settings of `user_id`, creating the default document on first access.
    pub async fn load_settings(&self, user_id: &str) -> Result<SettingsDocument, AppError> {
        let conn = self.conn.lock().await;
        let stored: Option<String> = conn
            .query_row(
                "SELECT document FROM settings WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(json) = stored {
            return Ok(serde_json::from_str(&json)?);
        }

        let document = SettingsDocument {
            user_id: user_id.to_string(),
            ..SettingsDocument::default()
        };
        write_settings(&conn, &document)?;
        Ok(document)
    }

    /// Store a settings document. A document without `updated_at` is stamped
    /// with the server clock.
    pub async fn save_settings(
        &self,
        user_id: &str,
        mut document: SettingsDocument,
    ) -> Result<SettingsDocument, AppError> {
        user_id.clone_into(&mut document.user_id);
        document.updated_at = Some(document.updated_at.unwrap_or_else(now));

        let conn = self.conn.lock().await;
        write_settings(&conn, &document)?;
        Ok(document)
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: NoteId::from(row.get::<_, String>(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        workspace: row.get(3)?,
        created_at: from_millis(row.get(4)?),
        updated_at: from_millis(row.get(5)?),
        user_id: row.get(6)?,
    })
}

fn select_note(conn: &Connection, user_id: &str, id: &NoteId) -> rusqlite::Result<Option<Note>> {
    conn.query_row(
        &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ?1 AND id = ?2"),
        params![user_id, id.as_str()],
        note_from_row,
    )
    .optional()
}

fn select_notes(
    conn: &Connection,
    user_id: &str,
    workspace: Option<&str>,
) -> rusqlite::Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes
         WHERE user_id = ?1 AND (?2 IS NULL OR workspace = ?2)
         ORDER BY updated_at DESC, id ASC"
    ))?;
    let notes = stmt
        .query_map(params![user_id, workspace], note_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notes)
}

fn write_note(conn: &Connection, user_id: &str, note: &Note) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO notes (user_id, id, title, content, workspace, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id, id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            workspace = excluded.workspace,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at",
        params![
            user_id,
            note.id.as_str(),
            note.title,
            note.content,
            note.workspace,
            note.created_at.timestamp_millis(),
            note.updated_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

fn write_settings(conn: &Connection, document: &SettingsDocument) -> Result<(), AppError> {
    let json = serde_json::to_string(document)?;
    conn.execute(
        "INSERT INTO settings (user_id, document) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET document = excluded.document",
        params![document.user_id, json],
    )?;
    Ok(())
}
