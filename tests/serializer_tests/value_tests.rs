//! Tests for the value serializers
//!
//! These tests verify:
//! - Every value type round-trips through its serializer
//! - The registry resolves serializers by runtime type and by tag
//! - Keys built from values compare like the values themselves
//! - Malformed bytes are serialization errors

use std::collections::BTreeMap;

use xiaolongbaodb::node::Key;
use xiaolongbaodb::serializer::{decode_value, encode_value, serializer_for, Serializer, ValueType};
use xiaolongbaodb::{Value, XlbError};

// =============================================================================
// Helper Functions
// =============================================================================

fn round_trip(value: Value) {
    let (value_type, bytes) = encode_value(&value).unwrap();
    assert_eq!(value_type, value.value_type());
    assert_eq!(decode_value(value_type as u8, &bytes).unwrap(), value);
}

fn key(value: Value) -> Key {
    Key::from_value(&value).unwrap()
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_scalars_round_trip() {
    for v in [i64::MIN, -1, 0, 1, i64::MAX] {
        round_trip(Value::Int(v));
    }
    for v in [f64::MIN, -0.5, 0.0, 1.25, f64::MAX, f64::INFINITY] {
        round_trip(Value::Float(v));
    }
    for s in ["", "bao", "小笼包"] {
        round_trip(Value::from(s));
    }
}

#[test]
fn test_nested_round_trip() {
    let mut inner = BTreeMap::new();
    inner.insert("n".to_string(), Value::Int(3));
    inner.insert("xs".to_string(), Value::List(vec![Value::Float(0.5), Value::from("a")]));

    let mut outer = BTreeMap::new();
    outer.insert("inner".to_string(), Value::Map(inner));
    outer.insert("empty".to_string(), Value::List(vec![]));

    round_trip(Value::Map(outer.clone()));
    round_trip(Value::List(vec![Value::Map(outer), Value::Int(-9)]));
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_type_tags() {
    assert_eq!(Value::Int(0).value_type() as u8, 1);
    assert_eq!(Value::Float(0.0).value_type() as u8, 2);
    assert_eq!(Value::from("").value_type() as u8, 3);
    assert_eq!(Value::Map(BTreeMap::new()).value_type() as u8, 4);
    assert_eq!(Value::List(vec![]).value_type() as u8, 5);
}

#[test]
fn test_serializer_for_tag() {
    let bytes = serializer_for(ValueType::Text).serialize(&Value::from("x")).unwrap();
    assert_eq!(bytes, b"x".to_vec());

    let value = serializer_for(ValueType::try_from(1u8).unwrap())
        .deserialize(&bytes_of_int(7))
        .unwrap();
    assert_eq!(value, Value::Int(7));
}

fn bytes_of_int(v: i64) -> Vec<u8> {
    encode_value(&Value::Int(v)).unwrap().1
}

// =============================================================================
// Key Ordering Tests
// =============================================================================

#[test]
fn test_integer_keys_order_numerically() {
    let mut keys: Vec<i64> = vec![5, -3, 0, i64::MAX, -100, 42, i64::MIN];
    let mut by_key = keys.clone();
    by_key.sort_by_key(|&v| key(Value::Int(v)));
    keys.sort();
    assert_eq!(by_key, keys);
}

#[test]
fn test_float_keys_order_numerically() {
    let values = [-1e10, -2.5, -1e-3, 0.0, 1e-3, 2.5, 1e10];
    for pair in values.windows(2) {
        assert!(key(Value::Float(pair[0])) < key(Value::Float(pair[1])));
    }
}

#[test]
fn test_text_keys_order_bytewise() {
    assert!(key(Value::from("apple")) < key(Value::from("banana")));
    assert!(key(Value::from("a")) < key(Value::from("ab")));
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_unknown_tag() {
    assert!(matches!(decode_value(0, &[]), Err(XlbError::Serialization(_))));
    assert!(matches!(decode_value(6, &[1]), Err(XlbError::Serialization(_))));
}

#[test]
fn test_malformed_bytes() {
    assert!(decode_value(ValueType::Float as u8, &[0; 4]).is_err());
    assert!(decode_value(ValueType::Text as u8, &[0xff, 0xfe]).is_err());
    assert!(decode_value(ValueType::List as u8, &[0xff; 3]).is_err());
}
