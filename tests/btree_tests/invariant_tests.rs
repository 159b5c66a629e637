//! Tests for structural invariants under load
//!
//! These tests verify:
//! - Order, bounds, balance and occupancy hold after ascending,
//!   descending and shuffled inserts
//! - The same holds through interleaved deletes, against a BTreeMap model
//! - Odd and even orders
//! - Pages freed by merges are reused before the file grows

use std::collections::BTreeMap;

use xiaolongbaodb::node::Key;
use xiaolongbaodb::Value;

use crate::helpers::{check_tree, open_tree, setup_temp_db, shuffled};

// =============================================================================
// Helper Functions
// =============================================================================

fn int_key(k: i64) -> Key {
    Key::from_value(&Value::Int(k)).unwrap()
}

// =============================================================================
// Insert Tests
// =============================================================================

#[test]
fn test_ascending_inserts() {
    let (_temp, path) = setup_temp_db();
    let tree = open_tree(&path, 4);

    for k in 0..300 {
        tree.insert(k, k).unwrap();
    }

    let keys = check_tree(&tree);
    let expected: Vec<Key> = (0..300).map(int_key).collect();
    assert_eq!(keys, expected);
    assert!(tree.height().unwrap() > 3);
}

#[test]
fn test_descending_inserts() {
    let (_temp, path) = setup_temp_db();
    let tree = open_tree(&path, 5);

    for k in (0..300).rev() {
        tree.insert(k, k).unwrap();
    }

    assert_eq!(check_tree(&tree).len(), 300);
    for k in 0..300 {
        assert_eq!(tree.get(k).unwrap(), Some(Value::Int(k)));
    }
}

#[test]
fn test_shuffled_inserts_each_order() {
    for order in [3, 4, 5, 8, 13] {
        let (_temp, path) = setup_temp_db();
        let tree = open_tree(&path, order);

        for k in shuffled(400, 0x9e37_79b9 + order as u64) {
            tree.insert(k, -k).unwrap();
        }

        let keys = check_tree(&tree);
        assert_eq!(keys.len(), 400, "order {}", order);
    }
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_deletes_keep_invariants() {
    for order in [3, 4, 7] {
        let (_temp, path) = setup_temp_db();
        let tree = open_tree(&path, order);

        for k in shuffled(300, 7) {
            tree.insert(k, k).unwrap();
        }
        for (i, k) in shuffled(300, 11).into_iter().enumerate() {
            assert_eq!(tree.delete(k).unwrap(), Some(Value::Int(k)));
            if i % 25 == 0 {
                check_tree(&tree);
            }
        }

        assert!(check_tree(&tree).is_empty());
        assert_eq!(tree.height().unwrap(), 1);
    }
}

#[test]
fn test_mixed_operations_match_model() {
    let (_temp, path) = setup_temp_db();
    let tree = open_tree(&path, 4);
    let mut model = BTreeMap::new();

    let ops = shuffled(2000, 42);
    for (step, op) in ops.into_iter().enumerate() {
        let key = op % 150;
        if op % 3 == 0 {
            assert_eq!(
                tree.delete(key).unwrap(),
                model.remove(&key).map(Value::Int),
                "delete {} at step {}",
                key,
                step
            );
        } else {
            assert_eq!(
                tree.insert(key, op).unwrap(),
                model.insert(key, op).map(Value::Int),
                "insert {} at step {}",
                key,
                step
            );
        }
        if step % 200 == 0 {
            check_tree(&tree);
        }
    }

    let keys = check_tree(&tree);
    let expected: Vec<Key> = model.keys().map(|&k| int_key(k)).collect();
    assert_eq!(keys, expected);
    for (k, v) in &model {
        assert_eq!(tree.get(*k).unwrap(), Some(Value::Int(*v)));
    }
}

// =============================================================================
// Page Reuse Tests
// =============================================================================

#[test]
fn test_freed_pages_are_reused() {
    let (_temp, path) = setup_temp_db();
    let tree = open_tree(&path, 4);

    for k in 0..200 {
        tree.insert(k, k).unwrap();
    }
    let end = tree.handler().logical_end();

    for k in 0..200 {
        tree.delete(k).unwrap();
    }
    assert!(tree.handler().free_page_count() > 0);

    for k in 0..200 {
        tree.insert(k, k).unwrap();
    }

    assert_eq!(tree.handler().logical_end(), end);
    assert_eq!(tree.handler().free_page_count(), 0);
    check_tree(&tree);
}
