//! SQLite-backed attendance store.

use crate::{AttendanceRecord, AttendanceStore, StoreError};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Attendance store opening a fresh connection per operation.
///
/// Nothing is held between calls, so the CLI and daemon can point at the
/// same file without contending on a long-lived handle.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open the store, creating the parent directory, database file, and
    /// schema as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { path };
        let conn = store.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS attendance (name TEXT, time TEXT, date TEXT)",
            [],
        )?;
        tracing::info!(path = %store.path.display(), "attendance database ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Ok(Connection::open(&self.path)?)
    }
}

impl AttendanceStore for SqliteStore {
    fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO attendance (name, time, date) VALUES (?1, ?2, ?3)",
            rusqlite::params![record.name, record.time, record.date],
        )?;
        Ok(())
    }

    fn query_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT name, time, date FROM attendance ORDER BY date DESC, time DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok(AttendanceRecord {
                name: row.get(0)?,
                time: row.get(1)?,
                date: row.get(2)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, time: &str, date: &str) -> AttendanceRecord {
        AttendanceRecord {
            name: name.to_string(),
            time: time.to_string(),
            date: date.to_string(),
        }
    }

    #[test]
    fn test_insert_and_query_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("attendance.db")).unwrap();

        store.insert(&record("alice", "09:00:00", "2025-03-01")).unwrap();
        store.insert(&record("bob", "09:05:00", "2025-03-01")).unwrap();

        let records = store.query_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "bob");
        assert_eq!(records[1].name, "alice");
    }

    #[test]
    fn test_query_orders_by_date_then_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("attendance.db")).unwrap();

        store.insert(&record("early", "08:00:00", "2025-03-02")).unwrap();
        store.insert(&record("yesterday", "23:59:59", "2025-03-01")).unwrap();
        store.insert(&record("late", "17:30:00", "2025-03-02")).unwrap();

        let names: Vec<_> = store
            .query_all()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["late", "early", "yesterday"]);
    }

    #[test]
    fn test_duplicate_rows_allowed() {
        // Dedup is caller-side; the table takes repeats as-is.
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("attendance.db")).unwrap();

        let rec = record("alice", "09:00:00", "2025-03-01");
        store.insert(&rec).unwrap();
        store.insert(&rec).unwrap();

        assert_eq!(store.query_all().unwrap().len(), 2);
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(&record("alice", "09:00:00", "2025-03-01")).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.query_all().unwrap().len(), 1);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/attendance.db");
        let store = SqliteStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.query_all().unwrap().is_empty());
    }
}
