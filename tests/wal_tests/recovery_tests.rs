//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Committed batches survive an unclean shutdown
//! - Uncommitted and rolled-back frames are discarded on replay
//! - The log is cut back to the last Commit/Rollback frame
//! - A torn frame at the tail ends replay
//! - Unknown frame types and a foreign page size are corruption

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use xiaolongbaodb::wal::{wal_path, FrameType, WriteAheadLog, FRAME_HEADER_SIZE, HEADER_SIZE};
use xiaolongbaodb::XlbError;

// =============================================================================
// Helper Functions
// =============================================================================

const PAGE_SIZE: usize = 64;

fn setup_temp_db() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    (temp_dir, db_path)
}

fn image(fill: u8) -> Vec<u8> {
    vec![fill; PAGE_SIZE]
}

/// Append raw bytes to the log, as a crashed writer might have left them
fn append_raw(db_path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new()
        .append(true)
        .open(wal_path(db_path))
        .unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

fn wal_len(db_path: &PathBuf) -> u64 {
    fs::metadata(wal_path(db_path)).unwrap().len()
}

// =============================================================================
// Recover: Clean Log Tests
// =============================================================================

#[test]
fn test_recover_header_only() {
    let (_temp, db_path) = setup_temp_db();
    drop(WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap());

    let wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
    let stats = wal.recovery().unwrap();

    assert_eq!(stats.frames_replayed, 0);
    assert_eq!(stats.pages_committed, 0);
    assert!(!stats.was_truncated);
}

#[test]
fn test_recover_committed_batches() {
    let (_temp, db_path) = setup_temp_db();
    {
        let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
        wal.set_page(1, &image(1)).unwrap();
        wal.set_page(2, &image(2)).unwrap();
        wal.commit().unwrap();
        wal.set_page(1, &image(3)).unwrap();
        wal.commit().unwrap();
    }

    let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
    let stats = wal.recovery().unwrap().clone();

    assert_eq!(stats.frames_replayed, 5);
    assert_eq!(stats.pages_committed, 2);
    assert_eq!(stats.pages_discarded, 0);
    assert!(!stats.was_truncated);

    // the superseded image of page 1 still takes space in the log
    assert_eq!(wal.page_frames(), 3);

    // the later commit wins
    assert_eq!(wal.get_page(1).unwrap(), Some(image(3)));
    assert_eq!(wal.get_page(2).unwrap(), Some(image(2)));
}

// =============================================================================
// Recover: Discarded Frames Tests
// =============================================================================

#[test]
fn test_recover_discards_uncommitted_tail() {
    let (_temp, db_path) = setup_temp_db();
    let committed_len;
    {
        let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
        wal.set_page(1, &image(1)).unwrap();
        wal.commit().unwrap();
        committed_len = wal.len_bytes();
        wal.set_page(2, &image(2)).unwrap();
        wal.set_page(1, &image(9)).unwrap();
    }

    let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
    let stats = wal.recovery().unwrap().clone();

    assert_eq!(stats.pages_committed, 1);
    assert_eq!(stats.pages_discarded, 2);
    assert!(stats.was_truncated);
    assert_eq!(wal_len(&db_path), committed_len);

    assert_eq!(wal.get_page(1).unwrap(), Some(image(1)));
    assert_eq!(wal.get_page(2).unwrap(), None);
    assert_eq!(wal.page_frames(), 1);
}

#[test]
fn test_discarded_frames_never_join_a_later_commit() {
    let (_temp, db_path) = setup_temp_db();
    {
        let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
        wal.set_page(1, &image(1)).unwrap();
        wal.commit().unwrap();
        wal.set_page(2, &image(2)).unwrap();
    }
    {
        let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
        wal.set_page(3, &image(3)).unwrap();
        wal.commit().unwrap();
    }

    let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
    assert_eq!(wal.get_page(2).unwrap(), None);
    assert_eq!(wal.get_page(3).unwrap(), Some(image(3)));
    assert_eq!(wal.committed_pages(), 2);
}

#[test]
fn test_recover_discards_rolled_back_batch() {
    let (_temp, db_path) = setup_temp_db();
    {
        let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
        wal.set_page(1, &image(1)).unwrap();
        wal.rollback().unwrap();
        wal.set_page(2, &image(2)).unwrap();
        wal.commit().unwrap();
    }

    let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
    let stats = wal.recovery().unwrap().clone();

    assert_eq!(stats.pages_committed, 1);
    assert_eq!(stats.pages_discarded, 1);
    assert!(!stats.was_truncated);
    assert_eq!(wal.get_page(1).unwrap(), None);
    assert_eq!(wal.get_page(2).unwrap(), Some(image(2)));
}

// =============================================================================
// Recover: Torn and Corrupt Frames Tests
// =============================================================================

#[test]
fn test_recover_torn_page_frame() {
    let (_temp, db_path) = setup_temp_db();
    let committed_len;
    {
        let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
        wal.set_page(1, &image(1)).unwrap();
        wal.commit().unwrap();
        committed_len = wal.len_bytes();
    }

    // frame header plus half an image
    let mut torn = vec![FrameType::Page as u8, 0, 0, 0, 2];
    torn.extend_from_slice(&image(2)[..PAGE_SIZE / 2]);
    append_raw(&db_path, &torn);

    let mut wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
    assert!(wal.recovery().unwrap().was_truncated);
    assert_eq!(wal_len(&db_path), committed_len);
    assert_eq!(wal.get_page(1).unwrap(), Some(image(1)));
    assert_eq!(wal.get_page(2).unwrap(), None);
}

#[test]
fn test_recover_torn_frame_header() {
    let (_temp, db_path) = setup_temp_db();
    drop(WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap());
    append_raw(&db_path, &[FrameType::Commit as u8, 0]);

    let wal = WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap();
    assert!(wal.recovery().unwrap().was_truncated);
    assert_eq!(wal_len(&db_path), HEADER_SIZE as u64);
}

#[test]
fn test_recover_unknown_frame_type() {
    let (_temp, db_path) = setup_temp_db();
    drop(WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap());
    append_raw(&db_path, &[9, 0, 0, 0, 1]);

    let result = WriteAheadLog::open(&db_path, PAGE_SIZE);
    assert!(matches!(result, Err(XlbError::WalCorruption(_))));
}

#[test]
fn test_recover_page_size_mismatch() {
    let (_temp, db_path) = setup_temp_db();
    drop(WriteAheadLog::open(&db_path, PAGE_SIZE).unwrap());
    append_raw(&db_path, &[FrameType::Commit as u8, 0, 0, 0, 0]);

    let result = WriteAheadLog::open(&db_path, PAGE_SIZE * 2);
    assert!(matches!(result, Err(XlbError::WalCorruption(_))));
}

#[test]
fn test_frame_type_tags() {
    assert_eq!(FrameType::try_from(1u8).unwrap(), FrameType::Page);
    assert_eq!(FrameType::try_from(2u8).unwrap(), FrameType::Commit);
    assert_eq!(FrameType::try_from(3u8).unwrap(), FrameType::Rollback);
    assert!(FrameType::try_from(0u8).is_err());
    assert_eq!(FRAME_HEADER_SIZE, 5);
}
