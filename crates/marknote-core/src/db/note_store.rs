//! Note store implementation

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{Note, NoteId};
use crate::util;

const NOTE_COLUMNS: &str = "id, title, content, workspace, created_at, updated_at, user_id";

/// Trait for on-device note storage
pub trait NoteStore {
    /// List notes newest first, optionally restricted to one workspace
    fn list(&self, workspace: Option<&str>) -> Result<Vec<Note>>;

    /// Get a note by ID
    fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// Insert or overwrite a note
    fn upsert(&self, note: &Note) -> Result<()>;

    /// Remove a note, returning whether it existed
    fn remove(&self, id: &NoteId) -> Result<bool>;

    /// Replace the whole collection in one transaction
    fn replace_all(&self, notes: &[Note]) -> Result<()>;

    /// Notes whose id starts with `prefix`
    fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Note>>;
}

/// `SQLite` implementation of `NoteStore`
pub struct SqliteNoteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteNoteStore<'a> {
    /// Create a new store over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
        let id: String = row.get(0)?;
        Ok(Note {
            id: NoteId::from(id),
            title: row.get(1)?,
            content: row.get(2)?,
            workspace: row.get(3)?,
            created_at: util::from_millis(row.get(4)?),
            updated_at: util::from_millis(row.get(5)?),
            user_id: row.get(6)?,
        })
    }

    fn write(conn: &Connection, note: &Note) -> Result<()> {
        conn.execute(
            "INSERT INTO notes (id, title, content, workspace, created_at, updated_at, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                workspace = excluded.workspace,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                user_id = excluded.user_id",
            params![
                note.id.as_str(),
                note.title,
                note.content,
                note.workspace,
                note.created_at.timestamp_millis(),
                note.updated_at.timestamp_millis(),
                note.user_id,
            ],
        )?;
        Ok(())
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn list(&self, workspace: Option<&str>) -> Result<Vec<Note>> {
        let notes = if let Some(workspace) = workspace {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE workspace = ?1
                 ORDER BY updated_at DESC, id ASC"
            ))?;
            let rows = stmt.query_map(params![workspace], Self::parse_note)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes ORDER BY updated_at DESC, id ASC"
            ))?;
            let rows = stmt.query_map([], Self::parse_note)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(notes)
    }

    fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                params![id.as_str()],
                Self::parse_note,
            )
            .optional()?;
        Ok(note)
    }

    fn upsert(&self, note: &Note) -> Result<()> {
        Self::write(self.conn, note)
    }

    fn remove(&self, id: &NoteId) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id.as_str()])?;
        Ok(affected > 0)
    }

    fn replace_all(&self, notes: &[Note]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM notes", [])?;
        for note in notes {
            Self::write(&tx, note)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE substr(id, 1, length(?1)) = ?1
             ORDER BY updated_at DESC, id ASC"
        ))?;
        let rows = stmt.query_map(params![prefix], Self::parse_note)?;
        let notes = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }
}
