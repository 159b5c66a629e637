//! Serializer implementations and the type-keyed registry

use crate::error::{Result, XlbError};

use super::Value;

/// Type tag stored in front of every serialized key and value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    Int = 1,
    Float = 2,
    Text = 3,
    Map = 4,
    List = 5,
}

impl TryFrom<u8> for ValueType {
    type Error = XlbError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(ValueType::Int),
            2 => Ok(ValueType::Float),
            3 => Ok(ValueType::Text),
            4 => Ok(ValueType::Map),
            5 => Ok(ValueType::List),
            other => Err(XlbError::Serialization(format!(
                "no serializer for type tag {}",
                other
            ))),
        }
    }
}

/// Converts one kind of value to and from bytes
pub trait Serializer: Send + Sync {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>>;

    fn deserialize(&self, data: &[u8]) -> Result<Value>;
}

fn mismatch(expected: ValueType, value: &Value) -> XlbError {
    XlbError::Serialization(format!(
        "{:?} serializer cannot encode a {:?} value",
        expected,
        value.value_type()
    ))
}

fn fixed8(data: &[u8], what: &str) -> Result<[u8; 8]> {
    data.try_into().map_err(|_| {
        XlbError::Serialization(format!("{} needs 8 bytes, got {}", what, data.len()))
    })
}

const SIGN_BIT: u64 = 1 << 63;

pub struct IntSerializer;

impl Serializer for IntSerializer {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        match value {
            // flipping the sign bit makes byte order match numeric order
            Value::Int(v) => Ok(((*v as u64) ^ SIGN_BIT).to_be_bytes().to_vec()),
            other => Err(mismatch(ValueType::Int, other)),
        }
    }

    fn deserialize(&self, data: &[u8]) -> Result<Value> {
        let raw = u64::from_be_bytes(fixed8(data, "integer")?);
        Ok(Value::Int((raw ^ SIGN_BIT) as i64))
    }
}

pub struct FloatSerializer;

impl Serializer for FloatSerializer {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        match value {
            Value::Float(v) => {
                let bits = v.to_bits();
                let ordered = if bits & SIGN_BIT != 0 {
                    !bits
                } else {
                    bits ^ SIGN_BIT
                };
                Ok(ordered.to_be_bytes().to_vec())
            }
            other => Err(mismatch(ValueType::Float, other)),
        }
    }

    fn deserialize(&self, data: &[u8]) -> Result<Value> {
        let ordered = u64::from_be_bytes(fixed8(data, "float")?);
        let bits = if ordered & SIGN_BIT != 0 {
            ordered ^ SIGN_BIT
        } else {
            !ordered
        };
        Ok(Value::Float(f64::from_bits(bits)))
    }
}

pub struct TextSerializer;

impl Serializer for TextSerializer {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        match value {
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            other => Err(mismatch(ValueType::Text, other)),
        }
    }

    fn deserialize(&self, data: &[u8]) -> Result<Value> {
        let s = std::str::from_utf8(data)
            .map_err(|e| XlbError::Serialization(format!("invalid UTF-8 text: {}", e)))?;
        Ok(Value::Text(s.to_string()))
    }
}

pub struct MapSerializer;

impl Serializer for MapSerializer {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        match value {
            Value::Map(map) => Ok(bincode::serialize(map)?),
            other => Err(mismatch(ValueType::Map, other)),
        }
    }

    fn deserialize(&self, data: &[u8]) -> Result<Value> {
        Ok(Value::Map(bincode::deserialize(data)?))
    }
}

pub struct ListSerializer;

impl Serializer for ListSerializer {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        match value {
            Value::List(items) => Ok(bincode::serialize(items)?),
            other => Err(mismatch(ValueType::List, other)),
        }
    }

    fn deserialize(&self, data: &[u8]) -> Result<Value> {
        Ok(Value::List(bincode::deserialize(data)?))
    }
}

/// Resolve the serializer registered for a type
pub fn serializer_for(value_type: ValueType) -> &'static dyn Serializer {
    match value_type {
        ValueType::Int => &IntSerializer,
        ValueType::Float => &FloatSerializer,
        ValueType::Text => &TextSerializer,
        ValueType::Map => &MapSerializer,
        ValueType::List => &ListSerializer,
    }
}

/// Serialize a value with the serializer of its runtime type
pub fn encode_value(value: &Value) -> Result<(ValueType, Vec<u8>)> {
    let value_type = value.value_type();
    let bytes = serializer_for(value_type).serialize(value)?;
    Ok((value_type, bytes))
}

/// Deserialize bytes stored under a type tag
pub fn decode_value(tag: u8, data: &[u8]) -> Result<Value> {
    let value_type = ValueType::try_from(tag)?;
    serializer_for(value_type).deserialize(data)
}
