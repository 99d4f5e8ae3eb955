//! Named key/value slots: the persistence seam for the favorites store.

use crate::models::datetime_to_timestamp;
use crate::{Error, Result};
use rusqlite::{params, OptionalExtension};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::database::{Connection, Database};

/// Storage holding one serialized document per named slot
pub trait SlotStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Slots kept in the `slots` table of a SQLite database
pub struct SqliteSlotStore {
    conn: Connection,
}

impl SqliteSlotStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open (creating if needed) the database behind `db`
    pub fn open(db: &Database) -> Result<Self> {
        Ok(Self::new(db.open()?))
    }
}

impl SlotStore for SqliteSlotStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM slots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now();
        self.conn.execute(
            "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, datetime_to_timestamp(&now)],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM slots WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-process slots, mainly for tests. Writes can be made to fail to
/// exercise storage-full handling.
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: RefCell<HashMap<String, String>>,
    fail_writes: Cell<bool>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.get() {
            return Err(Error::Storage("quota exceeded".to_string()));
        }
        Ok(())
    }
}

impl SlotStore for MemorySlotStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        self.slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exercise(store: &dyn SlotStore) {
        assert_eq!(store.get("favorites").unwrap(), None);

        store.set("favorites", "[]").unwrap();
        assert_eq!(store.get("favorites").unwrap().as_deref(), Some("[]"));

        store.set("favorites", "[1]").unwrap();
        assert_eq!(store.get("favorites").unwrap().as_deref(), Some("[1]"));

        store.remove("favorites").unwrap();
        assert_eq!(store.get("favorites").unwrap(), None);

        // Removing a missing slot is not an error
        store.remove("favorites").unwrap();
    }

    #[test]
    fn test_memory_slots() {
        exercise(&MemorySlotStore::new());
    }

    #[test]
    fn test_sqlite_slots() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("slots.db"));
        let store = SqliteSlotStore::open(&db).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_sqlite_slots_persist_across_connections() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("slots.db"));

        SqliteSlotStore::open(&db).unwrap().set("k", "v").unwrap();
        let reopened = SqliteSlotStore::open(&db).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_memory_write_failure() {
        let store = MemorySlotStore::new();
        store.set("k", "v").unwrap();
        store.set_fail_writes(true);

        assert!(matches!(store.set("k", "w"), Err(Error::Storage(_))));
        assert!(store.remove("k").is_err());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
