//! Search functionality for Marknote
//!
//! Matching is a case-insensitive substring test on title or content, run
//! over notes already loaded from the store.

use crate::models::Note;

/// Whether `note` matches `query`. A blank query matches everything.
pub fn matches(note: &Note, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    note.title.to_lowercase().contains(&needle) || note.content.to_lowercase().contains(&needle)
}

/// Keep the notes matching `query`, preserving their order.
pub fn filter_notes(notes: Vec<Note>, query: &str) -> Vec<Note> {
    notes.into_iter().filter(|note| matches(note, query)).collect()
}
