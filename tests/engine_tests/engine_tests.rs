//! Tests for the log engine
//!
//! These tests verify:
//! - Basic get/put/delete operations
//! - Recovery by replay on reopen, for both index kinds
//! - Torn tail handling (repair and keep)
//! - Frame placement in the log file
//! - Ordered scans
//! - Concurrent access patterns
//! - Engine lifecycle (open/close)

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use logkv::logfile::{Entry, Recovery};
use logkv::{BTreeIndex, Config, Engine, HashIndex, Index, IndexKind, KvError, LogEngine};
use tempfile::TempDir;

const FILE: &str = "store.db";

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine(kind: IndexKind) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), kind);
    (temp_dir, engine)
}

fn open_engine(dir: &Path, kind: IndexKind) -> Engine {
    open_engine_with_repair(dir, kind, false)
}

fn open_engine_with_repair(dir: &Path, kind: IndexKind, repair: bool) -> Engine {
    let config = Config::builder()
        .data_dir(dir)
        .index_kind(kind)
        .btree_degree(2)
        .repair_torn_tail(repair)
        .build();
    Engine::open_with_config(&config).unwrap()
}

fn append_garbage(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

fn frame_len(key: &[u8], value: &[u8]) -> u64 {
    Entry::new(key, value).encoded_len()
}

const KINDS: [IndexKind; 2] = [IndexKind::Hash, IndexKind::BTree];

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("nested").join("db");

    let engine = LogEngine::open(&data_dir, FILE, HashIndex::new()).unwrap();

    assert!(data_dir.join(FILE).exists());
    assert_eq!(engine.path(), data_dir.join(FILE));
    assert!(engine.is_empty());
    assert_eq!(engine.write_offset(), 0);
}

#[test]
fn test_engine_put_and_get() {
    for kind in KINDS {
        let (_temp, engine) = setup_temp_engine(kind);

        engine.put(b"a", b"1").unwrap();
        engine.put(b"b", b"2").unwrap();

        assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(engine.get(b"c").unwrap(), None);
        assert_eq!(engine.len(), 2);
    }
}

#[test]
fn test_engine_last_write_wins() {
    for kind in KINDS {
        let (_temp, engine) = setup_temp_engine(kind);

        engine.put(b"a", b"1").unwrap();
        engine.put(b"a", b"2").unwrap();
        engine.put(b"a", b"3").unwrap();

        assert_eq!(engine.get(b"a").unwrap(), Some(b"3".to_vec()));
        assert_eq!(engine.len(), 1);
    }
}

#[test]
fn test_engine_delete_is_session_only() {
    for kind in KINDS {
        let temp_dir = TempDir::new().unwrap();

        {
            let engine = open_engine(temp_dir.path(), kind);
            engine.put(b"a", b"1").unwrap();
            engine.delete(b"a").unwrap();
            engine.delete(b"never-written").unwrap();

            assert_eq!(engine.get(b"a").unwrap(), None);
            assert!(!engine.contains(b"a"));
            engine.close().unwrap();
        }

        // Nothing was logged for the delete, so replay brings the key back
        let engine = open_engine(temp_dir.path(), kind);
        assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    }
}

#[test]
fn test_engine_empty_and_binary_values() {
    let (_temp, engine) = setup_temp_engine(IndexKind::Hash);

    engine.put(b"", b"empty key").unwrap();
    engine.put(b"empty value", b"").unwrap();
    engine.put(&[0x00, 0xFF, 0x0A], &[0xDE, 0xAD, 0x00]).unwrap();

    assert_eq!(engine.get(b"").unwrap(), Some(b"empty key".to_vec()));
    assert_eq!(engine.get(b"empty value").unwrap(), Some(Vec::new()));
    assert_eq!(engine.get(&[0x00, 0xFF, 0x0A]).unwrap(), Some(vec![0xDE, 0xAD, 0x00]));
}

#[test]
fn test_engine_large_value() {
    let (_temp, engine) = setup_temp_engine(IndexKind::BTree);
    let value = vec![0x5A; 4 * 1024 * 1024];

    engine.put(b"big", &value).unwrap();
    engine.put(b"small", b"x").unwrap();

    assert_eq!(engine.get(b"big").unwrap(), Some(value));
    assert_eq!(engine.get(b"small").unwrap(), Some(b"x".to_vec()));
}

#[test]
fn test_engine_get_entry() {
    let (_temp, engine) = setup_temp_engine(IndexKind::Hash);
    engine.put_entry(&Entry::new(b"k".to_vec(), b"v".to_vec())).unwrap();

    let entry = engine.get_entry(b"k").unwrap().unwrap();
    assert_eq!(entry.key, b"k");
    assert_eq!(entry.value, b"v");
    assert!(engine.get_entry(b"missing").unwrap().is_none());
}

// =============================================================================
// Log Layout Tests
// =============================================================================

#[test]
fn test_engine_frames_are_contiguous() {
    let (_temp, engine) = setup_temp_engine(IndexKind::Hash);
    let pairs: [(&[u8], &[u8]); 3] = [(b"a", b"1"), (b"bb", b"22"), (b"a", b"333")];

    let mut expected_offset = 0;
    for (key, value) in pairs {
        engine.put(key, value).unwrap();
        let location = engine.index().get(key).unwrap();

        assert_eq!(location.offset, expected_offset);
        assert_eq!(location.size as u64, frame_len(key, value));
        assert_eq!(location.file_id, 0);
        expected_offset = location.end();
    }

    assert_eq!(engine.write_offset(), expected_offset);
    engine.sync().unwrap();
    assert_eq!(fs::metadata(engine.path()).unwrap().len(), expected_offset);
}

#[test]
fn test_engine_log_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let engine = LogEngine::open(temp_dir.path(), FILE, HashIndex::new()).unwrap();
    engine.put(b"ab", b"c").unwrap();
    engine.close().unwrap();

    let bytes = fs::read(temp_dir.path().join(FILE)).unwrap();
    assert_eq!(bytes, vec![2, 0, 0, 0, 1, 0, 0, 0, b'a', b'b', b'c']);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_engine_reopen_replays_log() {
    for kind in KINDS {
        let temp_dir = TempDir::new().unwrap();

        {
            let engine = open_engine(temp_dir.path(), kind);
            engine.put(b"a", b"1").unwrap();
            engine.put(b"b", b"2").unwrap();
            engine.put(b"a", b"3").unwrap();
            engine.close().unwrap();
        }

        let engine = open_engine(temp_dir.path(), kind);
        assert_eq!(engine.get(b"a").unwrap(), Some(b"3".to_vec()));
        assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(engine.len(), 2);

        let report = engine.recovery();
        assert_eq!(report.frames_recovered, 3);
        assert!(!report.was_truncated);
        assert_eq!(report.bytes_consumed, engine.write_offset());
    }
}

#[test]
fn test_engine_reopen_without_close() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), IndexKind::Hash);
        engine.put(b"a", b"1").unwrap();
        // Dropped without close
    }

    let engine = open_engine(temp_dir.path(), IndexKind::Hash);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_engine_recovery_is_idempotent() {
    for kind in KINDS {
        let temp_dir = TempDir::new().unwrap();

        {
            let engine = open_engine(temp_dir.path(), kind);
            for i in 0..200 {
                engine.put(format!("key{}", i % 50).as_bytes(), format!("v{}", i).as_bytes()).unwrap();
            }
            engine.close().unwrap();
        }

        let first: Vec<_> = {
            let engine = open_engine(temp_dir.path(), kind);
            let snapshot = (0..50)
                .map(|i| engine.get(format!("key{}", i).as_bytes()).unwrap())
                .collect();
            engine.close().unwrap();
            snapshot
        };

        let engine = open_engine(temp_dir.path(), kind);
        let second: Vec<_> = (0..50)
            .map(|i| engine.get(format!("key{}", i).as_bytes()).unwrap())
            .collect();

        assert_eq!(first, second);
        assert_eq!(second[0], Some(b"v150".to_vec()));
        assert_eq!(engine.recovery().frames_recovered, 200);
    }
}

#[test]
fn test_engine_repairs_torn_tail() {
    for kind in KINDS {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join(FILE);

        let clean_len = {
            let engine = open_engine(temp_dir.path(), kind);
            engine.put(b"a", b"1").unwrap();
            engine.put(b"b", b"2").unwrap();
            let len = engine.write_offset();
            engine.close().unwrap();
            len
        };
        append_garbage(&log_path, &[0x01, 0x02, 0x03]);

        let engine = open_engine_with_repair(temp_dir.path(), kind, true);
        let report = engine.recovery();

        assert!(report.was_truncated);
        assert_eq!(report.torn_bytes, 3);
        assert_eq!(report.bytes_consumed, clean_len);
        assert_eq!(engine.write_offset(), clean_len);
        assert_eq!(fs::metadata(&log_path).unwrap().len(), clean_len);
        assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));

        // New frames land right after the last complete one
        engine.put(b"c", b"3").unwrap();
        engine.close().unwrap();

        let report = Recovery::verify(&log_path).unwrap();
        assert_eq!(report.frames_recovered, 3);
        assert!(!report.was_truncated);
    }
}

#[test]
fn test_engine_keeps_torn_tail_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join(FILE);
    let config = Config::builder().data_dir(temp_dir.path()).build();

    {
        let engine = Engine::open_with_config(&config).unwrap();
        engine.put(b"a", b"1").unwrap();
        engine.close().unwrap();
    }
    append_garbage(&log_path, &[0xEE; 5]);
    let dirty_len = fs::metadata(&log_path).unwrap().len();

    let engine = Engine::open_with_config(&config).unwrap();
    assert!(engine.recovery().was_truncated);
    assert_eq!(engine.write_offset(), dirty_len);
    assert_eq!(fs::metadata(&log_path).unwrap().len(), dirty_len);

    // Appends go after the dangling bytes and stay readable this session
    engine.put(b"b", b"2").unwrap();
    assert_eq!(engine.index().get(b"b").unwrap().offset, dirty_len);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_engine_open_empty_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(FILE), b"").unwrap();

    let engine = open_engine(temp_dir.path(), IndexKind::BTree);
    assert!(engine.is_empty());
    assert_eq!(engine.recovery().frames_recovered, 0);
}

#[test]
fn test_engine_open_with_only_garbage() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(FILE), [0xFFu8; 6]).unwrap();

    let engine = open_engine(temp_dir.path(), IndexKind::Hash);
    assert!(engine.is_empty());
    assert_eq!(engine.write_offset(), 6);

    engine.put(b"a", b"1").unwrap();
    assert_eq!(engine.index().get(b"a").unwrap().offset, 6);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    drop(engine);

    let engine = open_engine_with_repair(temp_dir.path(), IndexKind::Hash, true);
    assert!(engine.is_empty());
    assert_eq!(engine.write_offset(), 0);
}

#[test]
fn test_engine_damaged_middle_header_leaves_log_intact() {
    for kind in KINDS {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join(FILE);

        {
            let engine = open_engine(temp_dir.path(), kind);
            engine.put(b"a", b"1").unwrap();
            engine.put(b"b", b"2").unwrap();
            engine.put(b"c", b"3").unwrap();
            engine.close().unwrap();
        }
        let mut bytes = fs::read(&log_path).unwrap();
        assert_eq!(bytes.len(), 30);
        // High byte of the second frame's key length
        bytes[13] = 0x7F;
        fs::write(&log_path, &bytes).unwrap();

        let engine = open_engine(temp_dir.path(), kind);
        let report = engine.recovery();

        assert_eq!(report.frames_recovered, 1);
        assert_eq!(report.torn_bytes, 20);
        assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(engine.get(b"c").unwrap(), None);
        engine.close().unwrap();

        // Frames after the damage are still on disk for a later repair
        assert_eq!(fs::read(&log_path).unwrap(), bytes);
    }
}

#[test]
fn test_engine_get_reports_corrupt_frame() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), IndexKind::Hash);
    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"a longer value").unwrap();
    let cut = engine.index().get(b"b").unwrap().offset + 4;

    // Shrink the log underneath the open engine
    let file = OpenOptions::new().write(true).open(engine.path()).unwrap();
    file.set_len(cut).unwrap();
    drop(file);

    let err = engine.get(b"b").unwrap_err();
    assert!(err.is_corrupt_frame(), "unexpected error: {}", err);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_engine_scan_ordered() {
    let (_temp, engine) = setup_temp_engine(IndexKind::BTree);
    for key in ["delta", "alpha", "charlie", "bravo", "echo"] {
        engine.put(key.as_bytes(), key.to_uppercase().as_bytes()).unwrap();
    }
    engine.put(b"alpha", b"ALPHA2").unwrap();

    let all: Vec<_> = engine
        .scan(Bound::Unbounded, Bound::Unbounded)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let keys: Vec<&[u8]> = all.iter().map(|(k, _)| k.as_slice()).collect();
    let expected: [&[u8]; 5] = [b"alpha", b"bravo", b"charlie", b"delta", b"echo"];
    assert_eq!(keys, expected);
    assert_eq!(all[0].1, b"ALPHA2");

    let middle: Vec<_> = engine
        .scan(Bound::Included(&b"bravo"[..]), Bound::Excluded(&b"delta"[..]))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        middle,
        vec![
            (b"bravo".to_vec(), b"BRAVO".to_vec()),
            (b"charlie".to_vec(), b"CHARLIE".to_vec()),
        ]
    );
}

#[test]
fn test_engine_scan_hash_is_unordered() {
    let (_temp, engine) = setup_temp_engine(IndexKind::Hash);
    engine.put(b"a", b"1").unwrap();

    let err = engine.scan(Bound::Unbounded, Bound::Unbounded).err().unwrap();
    assert!(matches!(err, KvError::Unordered("hash")));
}

// =============================================================================
// Generic Index Tests
// =============================================================================

#[test]
fn test_engine_with_concrete_btree_index() {
    let temp_dir = TempDir::new().unwrap();
    let engine = LogEngine::open(temp_dir.path(), FILE, BTreeIndex::new(3)).unwrap();
    for i in 0..100 {
        engine.put(format!("k{:03}", i).as_bytes(), b"v").unwrap();
    }

    let tree = engine.index().read();
    tree.validate().unwrap();
    assert_eq!(tree.first_key(), Some(&b"k000"[..]));
    assert_eq!(tree.last_key(), Some(&b"k099"[..]));
}

#[test]
fn test_engine_open_path_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();

    assert_eq!(engine.index().name(), "hash");
    assert_eq!(engine.path(), temp_dir.path().join(FILE));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_engine_concurrent_writers() {
    for kind in KINDS {
        let (_temp, engine) = setup_temp_engine(kind);
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("t{}-k{}", t, i);
                        engine.put(key.as_bytes(), key.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 400);
        for t in 0..4 {
            for i in 0..100 {
                let key = format!("t{}-k{}", t, i);
                assert_eq!(engine.get(key.as_bytes()).unwrap(), Some(key.into_bytes()));
            }
        }
    }
}

#[test]
fn test_engine_readers_during_writes() {
    let (_temp, engine) = setup_temp_engine(IndexKind::BTree);
    for i in 0..100 {
        engine.put(format!("stable{}", i).as_bytes(), b"fixed").unwrap();
    }
    let engine = Arc::new(engine);

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..500 {
                engine.put(format!("hot{}", i % 10).as_bytes(), format!("{}", i).as_bytes()).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for round in 0..5 {
                    for i in 0..100 {
                        let value = engine.get(format!("stable{}", i).as_bytes()).unwrap();
                        assert_eq!(value, Some(b"fixed".to_vec()), "round {}", round);
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let engine = Arc::try_unwrap(engine).ok().unwrap();
    assert_eq!(engine.get(b"hot9").unwrap(), Some(b"499".to_vec()));
    engine.close().unwrap();
}
