//! Audit store tests

use crate::error::HarvestError;
use crate::models::{FileResult, FileStats};
use crate::storage::audit::{AuditRecord, AuditStore, JsonAuditStore};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn harvested(source: &str) -> FileResult {
    FileResult::harvested(
        source,
        BTreeMap::new(),
        FileStats {
            run_error_count: 1,
            run_success_count: 3,
            run_total_count: 4,
        },
    )
}

#[test]
fn test_missing_store_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonAuditStore::new(temp_dir.path().join("audit.json"));

    assert!(!store.exists("session").unwrap());
    assert!(store.records().unwrap().is_empty());
}

#[test]
fn test_insert_then_exists_across_instances() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("audit.json");

    let store = JsonAuditStore::new(&path);
    store.insert(AuditRecord::for_file(&harvested("session"))).unwrap();
    assert!(store.exists("session").unwrap());
    assert!(!store.exists("other").unwrap());

    let reopened = JsonAuditStore::new(&path);
    let records = reopened.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, "session");
    assert!(!records[0].has_error);
    assert_eq!(records[0].run_error_count, 1);
    assert_eq!(records[0].run_success_count, 3);
}

#[test]
fn test_failed_file_row() {
    let record = AuditRecord::for_file(&FileResult::failed("session", "bad file"));

    assert!(record.has_error);
    assert_eq!(record.run_error_count, 0);
    assert_eq!(record.run_success_count, 0);
}

#[test]
fn test_corrupt_store_is_an_audit_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audit.json");
    fs::write(&path, "{ not json").unwrap();
    let store = JsonAuditStore::new(&path);

    assert!(matches!(
        store.exists("session"),
        Err(HarvestError::AuditStore { .. })
    ));
    assert!(matches!(
        store.insert(AuditRecord::for_file(&harvested("session"))),
        Err(HarvestError::AuditStore { .. })
    ));
}
