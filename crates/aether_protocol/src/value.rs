//! A small self-describing binary value format.
//!
//! Every request/response payload is a tree of `Value`s: maps, arrays, and
//! primitives, each tagged with its own type byte. Decoding is a plain
//! discriminated-union parser (explicit branches per tag) rather than
//! reflection, the same discipline the key-value driver uses for its own
//! shape-polymorphic config parsing.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use crate::error::{ProtocolError, Result};

const TAG_NULL: u8 = 0x00;
const TAG_FALSE: u8 = 0x01;
const TAG_TRUE: u8 = 0x02;
const TAG_I64: u8 = 0x03;
const TAG_STR: u8 = 0x04;
const TAG_BYTES: u8 = 0x05;
const TAG_ARRAY: u8 = 0x06;
const TAG_MAP: u8 = 0x07;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn map() -> ValueMapBuilder {
        ValueMapBuilder(BTreeMap::new())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Value::Null => out.push(TAG_NULL),
            Value::Bool(false) => out.push(TAG_FALSE),
            Value::Bool(true) => out.push(TAG_TRUE),
            Value::I64(v) => {
                out.push(TAG_I64);
                out.write_i64::<BigEndian>(*v).unwrap();
            }
            Value::Str(s) => {
                out.push(TAG_STR);
                let bytes = s.as_bytes();
                out.write_u32::<BigEndian>(bytes.len() as u32).unwrap();
                out.extend_from_slice(bytes);
            }
            Value::Bytes(b) => {
                out.push(TAG_BYTES);
                out.write_u32::<BigEndian>(b.len() as u32).unwrap();
                out.extend_from_slice(b);
            }
            Value::Array(items) => {
                out.push(TAG_ARRAY);
                out.write_u32::<BigEndian>(items.len() as u32).unwrap();
                for item in items {
                    item.write(out);
                }
            }
            Value::Map(fields) => {
                out.push(TAG_MAP);
                out.write_u32::<BigEndian>(fields.len() as u32).unwrap();
                for (k, v) in fields {
                    let kb = k.as_bytes();
                    out.write_u32::<BigEndian>(kb.len() as u32).unwrap();
                    out.extend_from_slice(kb);
                    v.write(out);
                }
            }
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let value = read_value(&mut cursor)?;
        Ok(value)
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Ok(m),
            other => Err(ProtocolError::WrongType {
                field: "<root>",
                expected: "map",
                got: other.type_name(),
            }),
        }
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(ProtocolError::WrongType {
                field: "<root>",
                expected: "array",
                got: other.type_name(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(ProtocolError::WrongType {
                field: "<root>",
                expected: "string",
                got: other.type_name(),
            }),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::I64(v) => Ok(*v),
            other => Err(ProtocolError::WrongType {
                field: "<root>",
                expected: "integer",
                got: other.type_name(),
            }),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "integer",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }
}

pub struct ValueMapBuilder(BTreeMap<String, Value>);

impl ValueMapBuilder {
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Value {
        Value::Map(self.0)
    }
}

/// Read one required field out of a decoded map, with a precise type error.
pub fn field<'a>(map: &'a BTreeMap<String, Value>, name: &'static str) -> Result<&'a Value> {
    map.get(name).ok_or(ProtocolError::MissingField(name))
}

pub fn field_str(map: &BTreeMap<String, Value>, name: &'static str) -> Result<String> {
    match field(map, name)? {
        Value::Str(s) => Ok(s.clone()),
        other => Err(ProtocolError::WrongType {
            field: name,
            expected: "string",
            got: other.type_name(),
        }),
    }
}

pub fn field_str_opt(map: &BTreeMap<String, Value>, name: &'static str) -> Result<Option<String>> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ProtocolError::WrongType {
            field: name,
            expected: "string",
            got: other.type_name(),
        }),
    }
}

pub fn field_i64(map: &BTreeMap<String, Value>, name: &'static str) -> Result<i64> {
    match field(map, name)? {
        Value::I64(v) => Ok(*v),
        other => Err(ProtocolError::WrongType {
            field: name,
            expected: "integer",
            got: other.type_name(),
        }),
    }
}

pub fn field_str_list(map: &BTreeMap<String, Value>, name: &'static str) -> Result<Vec<String>> {
    match field(map, name)? {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Str(s) => Ok(s.clone()),
                other => Err(ProtocolError::WrongType {
                    field: name,
                    expected: "string",
                    got: other.type_name(),
                }),
            })
            .collect(),
        other => Err(ProtocolError::WrongType {
            field: name,
            expected: "array",
            got: other.type_name(),
        }),
    }
}

fn read_value(cursor: &mut Cursor<&[u8]>) -> Result<Value> {
    let tag = read_u8(cursor)?;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_FALSE => Ok(Value::Bool(false)),
        TAG_TRUE => Ok(Value::Bool(true)),
        TAG_I64 => {
            let v = cursor
                .read_i64::<BigEndian>()
                .map_err(|_| truncated(cursor, 8))?;
            Ok(Value::I64(v))
        }
        TAG_STR => {
            let len = read_u32(cursor)? as usize;
            let bytes = read_exact(cursor, len)?;
            let s = String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
            Ok(Value::Str(s))
        }
        TAG_BYTES => {
            let len = read_u32(cursor)? as usize;
            let bytes = read_exact(cursor, len)?;
            Ok(Value::Bytes(bytes))
        }
        TAG_ARRAY => {
            let count = read_u32(cursor)?;
            let mut items = Vec::with_capacity(count.min(1 << 16) as usize);
            for _ in 0..count {
                items.push(read_value(cursor)?);
            }
            Ok(Value::Array(items))
        }
        TAG_MAP => {
            let count = read_u32(cursor)?;
            let mut map = BTreeMap::new();
            for _ in 0..count {
                let klen = read_u32(cursor)? as usize;
                let kbytes = read_exact(cursor, klen)?;
                let key = String::from_utf8(kbytes).map_err(|_| ProtocolError::InvalidUtf8)?;
                let value = read_value(cursor)?;
                map.insert(key, value);
            }
            Ok(Value::Map(map))
        }
        other => Err(ProtocolError::UnknownTag(other)),
    }
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    cursor.read_u8().map_err(|_| truncated(cursor, 1))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor
        .read_u32::<BigEndian>()
        .map_err(|_| truncated(cursor, 4))
}

fn read_exact(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| truncated(cursor, len))?;
    Ok(buf)
}

fn truncated(cursor: &Cursor<&[u8]>, want: usize) -> ProtocolError {
    let remaining = cursor.get_ref().len().saturating_sub(cursor.position() as usize);
    ProtocolError::Truncated {
        expected: want,
        got: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_nested_structures() {
        let value = Value::map()
            .field("host", Value::Str("db.internal".into()))
            .field("port", Value::I64(3306))
            .field(
                "tables",
                Value::Array(vec![Value::Str("t1".into()), Value::Str("t2".into())]),
            )
            .field("job_id", Value::Null)
            .build();

        let bytes = value.encode();
        let decoded = Value::decode(&bytes).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn rejects_truncated_payload() {
        let value = Value::map().field("host", Value::Str("x".into())).build();
        let mut bytes = value.encode();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            Value::decode(&bytes),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn rejects_unknown_tag() {
        let bytes = vec![0xEE];
        assert!(matches!(
            Value::decode(&bytes),
            Err(ProtocolError::UnknownTag(0xEE))
        ));
    }

    #[test]
    fn field_type_mismatch_is_precise() {
        let value = Value::map().field("port", Value::Str("not-a-number".into())).build();
        let map = value.as_map().unwrap();
        let err = field_i64(map, "port").unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::WrongType {
                field: "port",
                expected: "integer",
                ..
            }
        ));
    }
}
