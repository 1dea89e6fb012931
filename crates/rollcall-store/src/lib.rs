//! rollcall-store — attendance persistence and export.
//!
//! One append-only `attendance` table of (name, time, date) rows. The
//! storage layer enforces no uniqueness; deduplication is the caller's
//! job (a live session records each person once per run, uploads record
//! unconditionally).

mod export;
mod memory;
mod sqlite;

pub use export::{records_to_csv, write_csv};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One attendance event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub name: String,
    /// Wall-clock time of day, "%H:%M:%S".
    pub time: String,
    /// Calendar date, "%Y-%m-%d".
    pub date: String,
}

impl AttendanceRecord {
    /// Record for `name` stamped with the current local time and date.
    pub fn now(name: &str) -> Self {
        let now = Local::now();
        Self {
            name: name.to_string(),
            time: now.format("%H:%M:%S").to_string(),
            date: now.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Narrow persistence capability used by the recognition front ends.
pub trait AttendanceStore {
    /// Append one record.
    fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// All records, most recent first (date, then time, descending).
    fn query_all(&self) -> Result<Vec<AttendanceRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_now_formats() {
        let record = AttendanceRecord::now("alice");
        assert_eq!(record.name, "alice");
        // %H:%M:%S and %Y-%m-%d shapes.
        assert_eq!(record.time.len(), 8);
        assert_eq!(&record.time[2..3], ":");
        assert_eq!(record.date.len(), 10);
        assert_eq!(&record.date[4..5], "-");
    }
}
