//! Tombstone ledger
//!
//! Durable record of note ids deleted on this device. An id stays here until
//! a round trip confirms it is gone both locally and remotely.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::NoteId;
use crate::util;

pub trait TombstoneLedger {
    /// Add an id; recording the same id twice is a no-op
    fn record(&self, id: &NoteId) -> Result<()>;

    fn list(&self) -> Result<HashSet<NoteId>>;

    fn contains(&self, id: &NoteId) -> Result<bool>;

    /// Drop a single entry (used to roll back a failed delete)
    fn remove(&self, id: &NoteId) -> Result<bool>;

    /// Remove every entry whose id is not in `existing`, returning how many went
    fn prune(&self, existing: &HashSet<NoteId>) -> Result<usize>;

    fn clear(&self) -> Result<usize>;
}

/// `SQLite` implementation of `TombstoneLedger`
pub struct SqliteTombstoneLedger<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTombstoneLedger<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl TombstoneLedger for SqliteTombstoneLedger<'_> {
    fn record(&self, id: &NoteId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO tombstones (id, deleted_at) VALUES (?1, ?2)",
            params![id.as_str(), util::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn list(&self) -> Result<HashSet<NoteId>> {
        let mut stmt = self.conn.prepare("SELECT id FROM tombstones")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|id| id.map(NoteId::from))
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    fn contains(&self, id: &NoteId) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM tombstones WHERE id = ?1",
                params![id.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn remove(&self, id: &NoteId) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM tombstones WHERE id = ?1", params![id.as_str()])?;
        Ok(affected > 0)
    }

    fn prune(&self, existing: &HashSet<NoteId>) -> Result<usize> {
        let stale: Vec<NoteId> = self
            .list()?
            .into_iter()
            .filter(|id| !existing.contains(id))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        for id in &stale {
            tx.execute("DELETE FROM tombstones WHERE id = ?1", params![id.as_str()])?;
        }
        tx.commit()?;
        Ok(stale.len())
    }

    fn clear(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM tombstones", [])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn ids(values: &[&str]) -> HashSet<NoteId> {
        values.iter().copied().map(NoteId::from).collect()
    }

    #[test]
    fn record_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let ledger = SqliteTombstoneLedger::new(db.connection());

        ledger.record(&NoteId::from("x")).unwrap();
        ledger.record(&NoteId::from("x")).unwrap();

        assert_eq!(ledger.list().unwrap(), ids(&["x"]));
        assert!(ledger.contains(&NoteId::from("x")).unwrap());
        assert!(!ledger.contains(&NoteId::from("y")).unwrap());
    }

    #[test]
    fn prune_drops_ids_missing_from_existing_set() {
        let db = Database::open_in_memory().unwrap();
        let ledger = SqliteTombstoneLedger::new(db.connection());
        for id in ["a", "b", "c"] {
            ledger.record(&NoteId::from(id)).unwrap();
        }

        let pruned = ledger.prune(&ids(&["b"])).unwrap();
        assert_eq!(pruned, 2);
        assert_eq!(ledger.list().unwrap(), ids(&["b"]));
    }

    #[test]
    fn remove_and_clear() {
        let db = Database::open_in_memory().unwrap();
        let ledger = SqliteTombstoneLedger::new(db.connection());
        ledger.record(&NoteId::from("a")).unwrap();
        ledger.record(&NoteId::from("b")).unwrap();

        assert!(ledger.remove(&NoteId::from("a")).unwrap());
        assert!(!ledger.remove(&NoteId::from("a")).unwrap());
        assert_eq!(ledger.clear().unwrap(), 1);
        assert!(ledger.list().unwrap().is_empty());
    }
}
