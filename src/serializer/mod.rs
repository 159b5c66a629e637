//! Value Serializer Module
//!
//! Converts caller values to and from the tagged byte blobs stored in
//! leaf entries.
//!
//! ## Responsibilities
//! - One serializer per value type, picked by the value's runtime type
//! - A one-byte tag stored next to the bytes so values round-trip
//! - Order-preserving encodings for integers and floats, since the tree
//!   compares keys on their raw bytes
//!
//! ## Type Tags
//! - 1: integer (i64, sign bit flipped, big-endian)
//! - 2: float (f64, order-preserving bit transform, big-endian)
//! - 3: text (UTF-8)
//! - 4: mapping (bincode)
//! - 5: sequence (bincode)

mod types;

pub use types::{
    decode_value, encode_value, serializer_for, FloatSerializer, IntSerializer, ListSerializer,
    MapSerializer, Serializer, TextSerializer, ValueType,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value that can be stored as a key or a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Map(BTreeMap<String, Value>),
    List(Vec<Value>),
}

impl Value {
    /// Runtime type, used to resolve the serializer
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::Map(_) => ValueType::Map,
            Value::List(_) => ValueType::List,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}
