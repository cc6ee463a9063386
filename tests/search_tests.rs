//! Tests for search over a RecordStore
//!
//! These tests verify:
//! - Linear scan on unordered stores (first match)
//! - Binary search on ordered stores (leftmost match)
//! - NotFound / RecordSizeMismatch handling
//! - Range-restricted search, contains and count
//! - Explicit order verification after reopen

use std::path::PathBuf;

use sobstore::{Config, OpenMode, RecordStore, SobError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("search.sob");
    (temp_dir, path)
}

/// Open a fresh 4-byte store and append the given records
fn store_with(path: &PathBuf, records: &[&[u8; 4]]) -> RecordStore {
    let config = Config::builder().itemsize(4).build();
    let mut store = RecordStore::open(path, OpenMode::CreateTruncate, config).unwrap();
    for record in records {
        store.append(&record[..]).unwrap();
    }
    store
}

// =============================================================================
// Unordered (linear scan) Tests
// =============================================================================

#[test]
fn test_unordered_index_finds_each_record() {
    let (_temp, path) = setup_temp_store();
    let store = store_with(&path, &[b"efgh", b"abcd", b"ijkl"]);

    assert!(!store.is_ordered());
    assert_eq!(store.index(b"efgh").unwrap(), 0);
    assert_eq!(store.index(b"abcd").unwrap(), 1);
    assert_eq!(store.index(b"ijkl").unwrap(), 2);
}

#[test]
fn test_unordered_index_returns_first_duplicate() {
    let (_temp, path) = setup_temp_store();
    let store = store_with(&path, &[b"zzzz", b"dupe", b"aaaa", b"dupe"]);

    assert_eq!(store.index(b"dupe").unwrap(), 1);
}

#[test]
fn test_unordered_index_not_found() {
    let (_temp, path) = setup_temp_store();
    let store = store_with(&path, &[b"efgh", b"abcd"]);

    assert!(matches!(store.index(b"wxyz"), Err(SobError::NotFound)));
}

// =============================================================================
// Ordered (binary search) Tests
// =============================================================================

#[test]
fn test_ordered_index_finds_each_record() {
    let (_temp, path) = setup_temp_store();
    let mut store = store_with(&path, &[b"mmmm", b"cccc", b"xxxx", b"aaaa", b"pppp"]);
    store.sort().unwrap();

    assert!(store.is_ordered());
    for (i, record) in [b"aaaa", b"cccc", b"mmmm", b"pppp", b"xxxx"].iter().enumerate() {
        assert_eq!(store.index(&record[..]).unwrap(), i as u64);
    }
}

#[test]
fn test_ordered_index_returns_a_matching_duplicate() {
    let (_temp, path) = setup_temp_store();
    let mut store = store_with(&path, &[b"bbbb", b"aaaa", b"bbbb", b"cccc", b"bbbb"]);
    store.sort().unwrap();

    let pos = store.index(b"bbbb").unwrap();

    assert_eq!(store.get(pos).unwrap(), b"bbbb");
    // Lower-bound search lands on the leftmost copy
    assert_eq!(pos, 1);
}

#[test]
fn test_ordered_index_not_found_between_and_outside() {
    let (_temp, path) = setup_temp_store();
    let mut store = store_with(&path, &[b"bbbb", b"dddd", b"ffff"]);
    store.sort().unwrap();

    assert!(matches!(store.index(b"aaaa"), Err(SobError::NotFound)));
    assert!(matches!(store.index(b"cccc"), Err(SobError::NotFound)));
    assert!(matches!(store.index(b"zzzz"), Err(SobError::NotFound)));
}

#[test]
fn test_ordered_and_unordered_agree_on_large_store() {
    let (_temp, path) = setup_temp_store();
    let config = Config::builder().itemsize(8).build();
    let mut store = RecordStore::open(&path, OpenMode::CreateTruncate, config).unwrap();

    // Even numbers only, in a scrambled order
    for i in 0..1000u64 {
        let value = (i * 7919) % 1000 * 2;
        store.append(&value.to_be_bytes()).unwrap();
    }

    let target = 1234u64.to_be_bytes();
    let unordered = store.index(&target).unwrap();
    assert_eq!(store.get(unordered).unwrap(), target);

    store.sort().unwrap();
    let ordered = store.index(&target).unwrap();
    assert_eq!(ordered, 617);
    assert_eq!(store.get(ordered).unwrap(), target);

    let absent = 1235u64.to_be_bytes();
    assert!(matches!(store.index(&absent), Err(SobError::NotFound)));
}

#[test]
fn test_append_after_sort_falls_back_to_scan() {
    let (_temp, path) = setup_temp_store();
    let mut store = store_with(&path, &[b"cccc", b"aaaa"]);
    store.sort().unwrap();

    // Appending out of order must not break lookups
    store.append(b"bbbb").unwrap();

    assert!(!store.is_ordered());
    assert_eq!(store.index(b"bbbb").unwrap(), 2);
    assert_eq!(store.index(b"cccc").unwrap(), 1);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_index_wrong_width() {
    let (_temp, path) = setup_temp_store();
    let mut store = store_with(&path, &[b"abcd"]);

    assert!(matches!(
        store.index(b"abc"),
        Err(SobError::RecordSizeMismatch {
            expected: 4,
            actual: 3
        })
    ));

    store.sort().unwrap();
    assert!(matches!(
        store.index(b"abcde"),
        Err(SobError::RecordSizeMismatch { .. })
    ));
}

#[test]
fn test_index_on_empty_store() {
    let (_temp, path) = setup_temp_store();
    let store = RecordStore::open(&path, OpenMode::CreateTruncate, Config::default()).unwrap();

    assert!(matches!(store.index(b"abcd"), Err(SobError::NotFound)));
    assert!(!store.contains(b"abcd").unwrap());
    assert_eq!(store.count(b"abcd").unwrap(), 0);
}

// =============================================================================
// Range / Contains / Count Tests
// =============================================================================

#[test]
fn test_index_in_range() {
    let (_temp, path) = setup_temp_store();
    let store = store_with(&path, &[b"dupe", b"aaaa", b"dupe", b"bbbb"]);

    assert_eq!(store.index_in(b"dupe", 0..4).unwrap(), 0);
    assert_eq!(store.index_in(b"dupe", 1..4).unwrap(), 2);
    assert!(matches!(store.index_in(b"dupe", 3..4), Err(SobError::NotFound)));
    // End is clamped to length
    assert_eq!(store.index_in(b"bbbb", 2..100).unwrap(), 3);
}

#[test]
fn test_index_in_range_ordered() {
    let (_temp, path) = setup_temp_store();
    let mut store = store_with(&path, &[b"bbbb", b"aaaa", b"bbbb", b"cccc"]);
    store.sort().unwrap();

    assert_eq!(store.index_in(b"bbbb", 2..4).unwrap(), 2);
    assert!(matches!(store.index_in(b"aaaa", 1..4), Err(SobError::NotFound)));
}

#[test]
fn test_contains() {
    let (_temp, path) = setup_temp_store();
    let store = store_with(&path, &[b"abcd", b"efgh"]);

    assert!(store.contains(b"efgh").unwrap());
    assert!(!store.contains(b"ijkl").unwrap());
    assert!(store.contains(b"ij").is_err());
}

#[test]
fn test_count_unordered_and_ordered() {
    let (_temp, path) = setup_temp_store();
    let mut store = store_with(&path, &[b"xxxx", b"aaaa", b"xxxx", b"bbbb", b"xxxx"]);

    assert_eq!(store.count(b"xxxx").unwrap(), 3);
    assert_eq!(store.count(b"aaaa").unwrap(), 1);
    assert_eq!(store.count(b"cccc").unwrap(), 0);

    store.sort().unwrap();
    assert_eq!(store.count(b"xxxx").unwrap(), 3);
    assert_eq!(store.count(b"aaaa").unwrap(), 1);
    assert_eq!(store.count(b"cccc").unwrap(), 0);
}

// =============================================================================
// Order Verification Tests
// =============================================================================

#[test]
fn test_verify_ordered_after_reopen() {
    let (_temp, path) = setup_temp_store();
    {
        let mut store = store_with(&path, &[b"cccc", b"aaaa", b"bbbb"]);
        store.sort().unwrap();
        store.close().unwrap();
    }

    let config = Config::builder().itemsize(4).build();
    let mut store = RecordStore::open(&path, OpenMode::ReadOnly, config).unwrap();
    assert!(!store.is_ordered());

    assert!(store.verify_ordered().unwrap());
    assert!(store.is_ordered());
    assert_eq!(store.index(b"bbbb").unwrap(), 1);
}

#[test]
fn test_verify_ordered_rejects_unsorted() {
    let (_temp, path) = setup_temp_store();
    let mut store = store_with(&path, &[b"aaaa", b"cccc", b"bbbb"]);

    assert!(!store.verify_ordered().unwrap());
    assert!(!store.is_ordered());
}

#[test]
fn test_verify_ordered_accepts_duplicates_and_empty() {
    let (_temp, path) = setup_temp_store();
    let mut store = store_with(&path, &[b"aaaa", b"aaaa", b"bbbb"]);
    assert!(store.verify_ordered().unwrap());

    store.clear().unwrap();
    assert!(store.verify_ordered().unwrap());
}
