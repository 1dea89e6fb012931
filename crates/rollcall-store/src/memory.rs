//! In-memory attendance store for tests and offline use.

use crate::{AttendanceRecord, AttendanceStore, StoreError};
use std::sync::Mutex;

/// Vec-backed [`AttendanceStore`] with the same ordering contract as the
/// SQLite store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<AttendanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AttendanceRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AttendanceStore for MemoryStore {
    fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.lock().push(record.clone());
        Ok(())
    }

    fn query_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut records = self.lock().clone();
        records.sort_by(|a, b| {
            (b.date.as_str(), b.time.as_str()).cmp(&(a.date.as_str(), a.time.as_str()))
        });
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
    fn test_insert_and_query() {
        let store = MemoryStore::new();
        store.insert(&record("alice", "09:00:00", "2025-03-01")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.query_all().unwrap()[0].name, "alice");
    }

    #[test]
    fn test_ordering_matches_sqlite_contract() {
        let store = MemoryStore::new();
        store.insert(&record("a", "08:00:00", "2025-03-02")).unwrap();
        store.insert(&record("b", "23:59:59", "2025-03-01")).unwrap();
        store.insert(&record("c", "17:30:00", "2025-03-02")).unwrap();

        let names: Vec<_> = store
            .query_all()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
