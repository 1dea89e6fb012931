//! CSV serialization of attendance records.

use crate::{AttendanceRecord, StoreError};
use std::path::Path;

/// Render records as CSV with a header row.
///
/// Fields containing commas, quotes, or newlines are double-quoted with
/// embedded quotes doubled.
pub fn records_to_csv(records: &[AttendanceRecord]) -> String {
    let mut out = String::from("name,time,date\n");
    for record in records {
        out.push_str(&csv_field(&record.name));
        out.push(',');
        out.push_str(&csv_field(&record.time));
        out.push(',');
        out.push_str(&csv_field(&record.date));
        out.push('\n');
    }
    out
}

/// Write records to a CSV file at `path`.
pub fn write_csv(path: &Path, records: &[AttendanceRecord]) -> Result<(), StoreError> {
    std::fs::write(path, records_to_csv(records))?;
    tracing::info!(
        path = %path.display(),
        count = records.len(),
        "attendance exported"
    );
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> AttendanceRecord {
        AttendanceRecord {
            name: name.to_string(),
            time: "09:00:00".to_string(),
            date: "2025-03-01".to_string(),
        }
    }

    #[test]
    fn test_empty_is_header_only() {
        assert_eq!(records_to_csv(&[]), "name,time,date\n");
    }

    #[test]
    fn test_plain_rows() {
        let csv = records_to_csv(&[record("alice"), record("bob")]);
        assert_eq!(
            csv,
            "name,time,date\nalice,09:00:00,2025-03-01\nbob,09:00:00,2025-03-01\n"
        );
    }

    #[test]
    fn test_comma_in_name_is_quoted() {
        let csv = records_to_csv(&[record("Doe, Jane")]);
        assert!(csv.contains("\"Doe, Jane\",09:00:00"));
    }

    #[test]
    fn test_quote_in_name_is_doubled() {
        let csv = records_to_csv(&[record("J\"J")]);
        assert!(csv.contains("\"J\"\"J\""));
    }

    #[test]
    fn test_write_csv_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        write_csv(&path, &[record("alice")]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("name,time,date\n"));
        assert!(contents.contains("alice"));
    }
}
