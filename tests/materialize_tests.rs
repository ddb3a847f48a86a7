//! Tests for the record materializer
//!
//! These tests verify:
//! - Cached and mapped resolution produce identical entries
//! - Tombstoned/expired pointers are skipped and never count toward the limit
//! - The walk stops once the limit is met (later pointers are never read)
//! - Segment failures abort the batch and carry the index key

use emberkv::config::{StorageMode, SyncStrategy};
use emberkv::index::ScanLimit;
use emberkv::record::{Entry, Flag, Location, Meta, RecordPointer, PERSISTENT};
use emberkv::segment::{SegmentStore, SegmentWriter, FIRST_FILE_ID};
use emberkv::tx::{materialize, resolve};
use emberkv::EmberError;
use tempfile::TempDir;

const NOW: u64 = 2_000_000_000;

// =============================================================================
// Helper Functions
// =============================================================================

struct Fixture {
    _temp: TempDir,
    store: SegmentStore,
    /// (key, mapped pointer, cached pointer) in key order
    records: Vec<(Vec<u8>, RecordPointer, RecordPointer)>,
}

/// Write records to a real segment and build both pointer flavors
fn fixture(records: &[(&str, &str, Flag)]) -> Fixture {
    let temp = TempDir::new().unwrap();
    let store = SegmentStore::open(&temp.path().join("segments"), 1 << 20).unwrap();
    let mut writer =
        SegmentWriter::open(store.clone(), FIRST_FILE_ID, 0, SyncStrategy::EveryCommit).unwrap();

    let mut built = Vec::new();
    for (key, value, flag) in records {
        let entry = Entry::new(
            "b",
            key.as_bytes().to_vec(),
            value.as_bytes().to_vec(),
            Meta::new(*flag, NOW - 10, PERSISTENT),
        );
        let location = writer.append(&entry).unwrap();
        built.push((
            key.as_bytes().to_vec(),
            RecordPointer::mapped(entry.meta, location),
            RecordPointer::cached(entry, location),
        ));
    }
    writer.commit().unwrap();

    Fixture {
        _temp: temp,
        store,
        records: built,
    }
}

fn mapped(f: &Fixture) -> Vec<(Vec<u8>, RecordPointer)> {
    f.records.iter().map(|(k, m, _)| (k.clone(), m.clone())).collect()
}

fn cached(f: &Fixture) -> Vec<(Vec<u8>, RecordPointer)> {
    f.records.iter().map(|(k, _, c)| (k.clone(), c.clone())).collect()
}

fn bogus(key: &str) -> (Vec<u8>, RecordPointer) {
    (
        key.as_bytes().to_vec(),
        RecordPointer::mapped(Meta::new(Flag::Normal, NOW - 10, PERSISTENT), Location::new(404, 0)),
    )
}

fn keys(entries: &emberkv::Entries) -> Vec<String> {
    entries
        .keys()
        .map(|k| String::from_utf8(k.to_vec()).unwrap())
        .collect()
}

// =============================================================================
// Mode Equivalence Tests
// =============================================================================

#[test]
fn test_cached_and_mapped_resolve_identically() {
    let f = fixture(&[("a", "1", Flag::Normal), ("b", "2", Flag::Normal), ("c", "3", Flag::Normal)]);

    let from_segments =
        resolve(mapped(&f), ScanLimit::NoLimit, StorageMode::Mapped, &f.store, NOW).unwrap();
    let from_index =
        resolve(cached(&f), ScanLimit::NoLimit, StorageMode::Cached, &f.store, NOW).unwrap();

    assert_eq!(from_segments, from_index);
    assert_eq!(keys(&from_segments), vec!["a", "b", "c"]);
    assert_eq!(from_segments.get(b"b").unwrap().value.as_ref(), b"2");
}

#[test]
fn test_cached_mode_does_no_io() {
    let f = fixture(&[("a", "1", Flag::Normal)]);
    std::fs::remove_file(f.store.segment_path(FIRST_FILE_ID)).unwrap();

    let entries =
        resolve(cached(&f), ScanLimit::NoLimit, StorageMode::Cached, &f.store, NOW).unwrap();
    assert_eq!(entries.len(), 1);

    let err = resolve(mapped(&f), ScanLimit::NoLimit, StorageMode::Mapped, &f.store, NOW)
        .unwrap_err();
    assert!(matches!(err, EmberError::SegmentIo { .. }));
}

// =============================================================================
// Filtering and Limit Tests
// =============================================================================

#[test]
fn test_tombstones_are_skipped() {
    let f = fixture(&[
        ("a1", "x", Flag::Normal),
        ("a2", "y", Flag::Normal),
        ("a3", "", Flag::Tombstone),
    ]);

    for (mode, pointers) in [(StorageMode::Mapped, mapped(&f)), (StorageMode::Cached, cached(&f))] {
        let entries = resolve(pointers, ScanLimit::Max(10), mode, &f.store, NOW).unwrap();
        assert_eq!(keys(&entries), vec!["a1", "a2"]);
    }
}

#[test]
fn test_expired_pointers_are_skipped() {
    let f = fixture(&[("a", "1", Flag::Normal)]);
    let mut pointers = mapped(&f);
    let (_, live) = pointers[0].clone();
    let mut stale = live.clone();
    stale.meta = Meta::new(Flag::Normal, NOW - 100, 30);
    pointers.insert(0, (b"0-stale".to_vec(), stale));

    let entries =
        resolve(pointers, ScanLimit::NoLimit, StorageMode::Mapped, &f.store, NOW).unwrap();

    assert_eq!(keys(&entries), vec!["a"]);
}

#[test]
fn test_dead_pointers_do_not_count_toward_limit() {
    let f = fixture(&[
        ("a", "", Flag::Tombstone),
        ("b", "", Flag::Tombstone),
        ("c", "3", Flag::Normal),
        ("d", "4", Flag::Normal),
        ("e", "5", Flag::Normal),
    ]);

    let entries = resolve(mapped(&f), ScanLimit::Max(2), StorageMode::Mapped, &f.store, NOW).unwrap();

    assert_eq!(keys(&entries), vec!["c", "d"]);
}

#[test]
fn test_limit_short_circuits_remaining_reads() {
    let f = fixture(&[("a", "1", Flag::Normal)]);
    let mut pointers = mapped(&f);
    pointers.push(bogus("z"));

    // The bogus pointer would fail with SegmentIo if it were ever read
    let entries = resolve(pointers, ScanLimit::Max(1), StorageMode::Mapped, &f.store, NOW).unwrap();

    assert_eq!(keys(&entries), vec!["a"]);
}

#[test]
fn test_zero_limit_returns_nothing() {
    let f = fixture(&[("a", "1", Flag::Normal)]);

    let entries = resolve(mapped(&f), ScanLimit::Max(0), StorageMode::Mapped, &f.store, NOW).unwrap();

    assert!(entries.is_empty());
}

#[test]
fn test_input_order_is_preserved() {
    let f = fixture(&[("m", "1", Flag::Normal), ("n", "2", Flag::Normal)]);
    let mut pointers = mapped(&f);
    pointers.reverse();

    let entries =
        resolve(pointers, ScanLimit::NoLimit, StorageMode::Mapped, &f.store, NOW).unwrap();

    assert_eq!(keys(&entries), vec!["n", "m"]);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_missing_segment_aborts_batch() {
    let f = fixture(&[("a", "1", Flag::Normal)]);
    let mut pointers = mapped(&f);
    pointers.push(bogus("z"));

    let err =
        resolve(pointers, ScanLimit::NoLimit, StorageMode::Mapped, &f.store, NOW).unwrap_err();

    assert!(matches!(err, EmberError::SegmentIo { file_id: 404, .. }));
}

#[test]
fn test_decode_error_carries_key() {
    let f = fixture(&[("a", "1", Flag::Normal)]);
    let (_, mut pointer) = mapped(&f).remove(0);
    pointer.location = Location::new(FIRST_FILE_ID, 1);

    match materialize(b"a", pointer, StorageMode::Mapped, &f.store).unwrap_err() {
        EmberError::Decode {
            file_id,
            offset,
            key,
            ..
        } => {
            assert_eq!(file_id, FIRST_FILE_ID);
            assert_eq!(offset, 1);
            assert_eq!(key.as_deref(), Some("a"));
        }
        other => panic!("expected Decode, got {:?}", other),
    }
}

#[test]
fn test_cached_mode_without_resident_entry() {
    let f = fixture(&[("a", "1", Flag::Normal)]);

    let err = resolve(mapped(&f), ScanLimit::NoLimit, StorageMode::Cached, &f.store, NOW)
        .unwrap_err();

    assert!(matches!(err, EmberError::MissingResident { ref key } if key == "a"));
}
