//! Last-write-wins note merge.

use std::collections::{BTreeMap, HashSet};

use crate::models::{Note, NoteId};

/// Combine local and remote collections into one canonical set.
///
/// Tombstoned ids never appear in the output. When both sides hold the same
/// id, the remote copy wins only with a strictly greater `updated_at`; ties
/// keep the local note. The result is sorted by `updated_at` descending with
/// ascending id as the tie-break, so equal inputs always give equal outputs.
pub fn merge_notes(local: &[Note], remote: &[Note], tombstones: &HashSet<NoteId>) -> Vec<Note> {
    let mut merged: BTreeMap<&NoteId, &Note> = BTreeMap::new();

    for note in local.iter().filter(|note| !tombstones.contains(&note.id)) {
        merged.insert(&note.id, note);
    }

    for note in remote.iter().filter(|note| !tombstones.contains(&note.id)) {
        merged
            .entry(&note.id)
            .and_modify(|current| {
                if note.updated_at > current.updated_at {
                    *current = note;
                }
            })
            .or_insert(note);
    }

    let mut notes: Vec<Note> = merged.into_values().cloned().collect();
    // stable sort keeps the id order from the BTreeMap among equal timestamps
    notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;
    use pretty_assertions::assert_eq;

    fn note(id: &str, updated_ms: i64, content: &str) -> Note {
        Note {
            id: NoteId::from(id),
            title: id.to_uppercase(),
            content: content.to_string(),
            workspace: "public".to_string(),
            created_at: util::from_millis(0),
            updated_at: util::from_millis(updated_ms),
            user_id: "u1".to_string(),
        }
    }

    fn tombstones(ids: &[&str]) -> HashSet<NoteId> {
        ids.iter().copied().map(NoteId::from).collect()
    }

    fn ids(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(|note| note.id.as_str()).collect()
    }

    #[test]
    fn newer_remote_copy_wins() {
        let local = [note("a", 1_000, "local")];
        let remote = [note("a", 2_000, "remote")];

        let merged = merge_notes(&local, &remote, &HashSet::new());
        assert_eq!(merged, vec![note("a", 2_000, "remote")]);
    }

    #[test]
    fn newer_local_copy_wins() {
        let local = [note("a", 3_000, "local")];
        let remote = [note("a", 2_000, "remote")];

        let merged = merge_notes(&local, &remote, &HashSet::new());
        assert_eq!(merged, vec![note("a", 3_000, "local")]);
    }

    #[test]
    fn equal_timestamps_keep_local() {
        let local = [note("a", 2_000, "local")];
        let remote = [note("a", 2_000, "remote")];

        let merged = merge_notes(&local, &remote, &HashSet::new());
        assert_eq!(merged[0].content, "local");
    }

    #[test]
    fn tombstoned_remote_note_is_excluded() {
        let remote = [note("x", 5_000, "resurrected"), note("y", 1_000, "kept")];

        let merged = merge_notes(&[], &remote, &tombstones(&["x"]));
        assert_eq!(ids(&merged), vec!["y"]);
    }

    #[test]
    fn tombstones_exclude_ids_from_both_sides() {
        let local = [note("a", 1_000, ""), note("b", 1_000, "")];
        let remote = [note("a", 9_000, ""), note("c", 1_000, "")];

        let merged = merge_notes(&local, &remote, &tombstones(&["a", "c"]));
        assert_eq!(ids(&merged), vec!["b"]);
    }

    #[test]
    fn empty_local_yields_remote_sorted_newest_first() {
        let remote = [
            note("old", 1_000, ""),
            note("new", 3_000, ""),
            note("mid", 2_000, ""),
        ];

        let merged = merge_notes(&[], &remote, &HashSet::new());
        assert_eq!(ids(&merged), vec!["new", "mid", "old"]);
    }

    #[test]
    fn empty_remote_is_identity_on_local() {
        let local = [note("b", 2_000, ""), note("a", 1_000, "")];
        let merged = merge_notes(&local, &[], &HashSet::new());
        assert_eq!(merged, local.to_vec());
    }

    #[test]
    fn equal_timestamps_order_by_id() {
        let local = [note("c", 1_000, ""), note("a", 1_000, "")];
        let remote = [note("b", 1_000, "")];

        let merged = merge_notes(&local, &remote, &HashSet::new());
        assert_eq!(ids(&merged), vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let local = [
            note("a", 1_000, "l"),
            note("b", 5_000, "l"),
            note("t", 7_000, "l"),
        ];
        let remote = [
            note("a", 4_000, "r"),
            note("b", 5_000, "r"),
            note("c", 2_000, "r"),
        ];
        let dead = tombstones(&["t"]);

        let once = merge_notes(&local, &remote, &dead);
        let twice = merge_notes(&once, &remote, &dead);
        assert_eq!(once, twice);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let local = vec![note("a", 1_000, "l")];
        let remote = vec![note("a", 2_000, "r")];
        let before = (local.clone(), remote.clone());

        let _ = merge_notes(&local, &remote, &HashSet::new());
        assert_eq!((local, remote), before);
    }
}
