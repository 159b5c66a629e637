//! Tests for crash atomicity
//!
//! A handler dropped without `close` stands in for a crash: the WAL is
//! left behind and replayed by the next open.
//!
//! These tests verify:
//! - A committed transaction survives a crash before checkpoint
//! - A crash in the middle of a transaction leaves the prior state
//! - The free-page list is rebuilt after a crash
//! - Commits after a checkpoint survive a crash
//! - A checkpoint torn mid-page is repaired from the WAL
//! - A torn page the WAL cannot restore is corruption

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tempfile::TempDir;
use xiaolongbaodb::node::{LeafNode, Node};
use xiaolongbaodb::storage::{FileHandler, PageRead};
use xiaolongbaodb::wal::wal_path;
use xiaolongbaodb::{Config, XlbError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    (temp_dir, db_path)
}

const PAGE_SIZE: u64 = 256;

fn config(path: &PathBuf) -> Config {
    Config::builder()
        .path(path.clone())
        .order(4)
        .page_size(256)
        .key_size(16)
        .value_size(16)
        .checkpoint_threshold(0)
        .build()
}

fn open(path: &PathBuf) -> FileHandler {
    FileHandler::open(&config(path)).unwrap()
}

fn truncate_db(path: &PathBuf, len: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(len).unwrap();
    file.sync_all().unwrap();
}

fn empty_leaf(page: u32) -> Node {
    Node::Leaf(LeafNode::new(page))
}

// =============================================================================
// Crash Tests
// =============================================================================

#[test]
fn test_committed_transaction_survives_crash() {
    let (_temp, db_path) = setup_temp_db();
    let page;
    {
        let handler = open(&db_path);
        let mut txn = handler.write_transaction();
        page = txn.next_available_page().unwrap();
        txn.ensure_root_block(empty_leaf(page)).unwrap();
        txn.commit().unwrap();
    }

    let handler = open(&db_path);
    assert_eq!(handler.meta().root, page);
    assert_eq!(handler.logical_end(), page + 1);

    let mut txn = handler.read_transaction();
    assert_eq!(txn.get_node(page).unwrap(), empty_leaf(page));
}

#[test]
fn test_crash_mid_transaction_keeps_prior_state() {
    let (_temp, db_path) = setup_temp_db();
    {
        let handler = open(&db_path);
        let mut txn = handler.write_transaction();
        let page = txn.next_available_page().unwrap();
        txn.ensure_root_block(empty_leaf(page)).unwrap();
        // the process dies before commit or rollback runs
        std::mem::forget(txn);
    }

    let handler = open(&db_path);
    assert_eq!(handler.meta().root, 1);
    assert_eq!(handler.logical_end(), 2);

    let mut txn = handler.read_transaction();
    assert!(txn.get_node(2).is_err());
}

#[test]
fn test_free_list_rebuilt_after_crash() {
    let (_temp, db_path) = setup_temp_db();
    {
        let handler = open(&db_path);
        let mut txn = handler.write_transaction();
        let a = txn.next_available_page().unwrap();
        let b = txn.next_available_page().unwrap();
        txn.set_node(empty_leaf(a)).unwrap();
        txn.set_node(empty_leaf(b)).unwrap();
        txn.commit().unwrap();

        let mut txn = handler.write_transaction();
        txn.free_page(a).unwrap();
        txn.commit().unwrap();
    }

    let handler = open(&db_path);
    assert_eq!(handler.free_page_count(), 1);

    let mut txn = handler.write_transaction();
    assert_eq!(txn.next_available_page().unwrap(), 2);
}

#[test]
fn test_commit_after_checkpoint_survives_crash() {
    let (_temp, db_path) = setup_temp_db();
    let page;
    {
        let handler = open(&db_path);
        handler.checkpoint().unwrap();

        let mut txn = handler.write_transaction();
        page = txn.next_available_page().unwrap();
        txn.ensure_root_block(empty_leaf(page)).unwrap();
        txn.commit().unwrap();
    }

    let handler = open(&db_path);
    assert_eq!(handler.meta().root, page);
    assert_eq!(handler.wal_committed_pages(), 2);
}

// =============================================================================
// Torn Checkpoint Tests
// =============================================================================

#[test]
fn test_checkpoint_torn_mid_page_recovers_from_wal() {
    let (_temp, db_path) = setup_temp_db();
    {
        let handler = open(&db_path);
        let mut txn = handler.write_transaction();
        let a = txn.next_available_page().unwrap();
        let b = txn.next_available_page().unwrap();
        txn.set_node(empty_leaf(a)).unwrap();
        txn.set_node(empty_leaf(b)).unwrap();
        txn.commit().unwrap();
    }
    let wal = fs::read(wal_path(&db_path)).unwrap();

    // checkpoint fully, then put back the log and tear the last page, as
    // if the process died while the checkpoint was writing it
    open(&db_path).close().unwrap();
    assert_eq!(fs::metadata(&db_path).unwrap().len(), 4 * PAGE_SIZE);
    fs::write(wal_path(&db_path), wal).unwrap();
    truncate_db(&db_path, 4 * PAGE_SIZE - 100);

    let handler = open(&db_path);
    assert_eq!(fs::metadata(&db_path).unwrap().len(), 3 * PAGE_SIZE);
    assert_eq!(handler.logical_end(), 4);
    {
        let mut txn = handler.read_transaction();
        assert_eq!(txn.get_node(3).unwrap(), empty_leaf(3));
    }

    handler.close().unwrap();
    assert_eq!(fs::metadata(&db_path).unwrap().len(), 4 * PAGE_SIZE);

    let handler = open(&db_path);
    let mut txn = handler.read_transaction();
    assert_eq!(txn.get_node(3).unwrap(), empty_leaf(3));
}

#[test]
fn test_torn_page_missing_from_wal_is_corrupt() {
    let (_temp, db_path) = setup_temp_db();
    open(&db_path).close().unwrap();
    {
        let handler = open(&db_path);
        let mut txn = handler.write_transaction();
        let page = txn.next_available_page().unwrap();
        txn.set_node(empty_leaf(page)).unwrap();
        txn.commit().unwrap();
    }

    // page 1 is torn, the WAL only holds page 2
    truncate_db(&db_path, 2 * PAGE_SIZE - 10);

    assert!(matches!(
        FileHandler::open(&config(&db_path)),
        Err(XlbError::CorruptPage { .. })
    ));
}
