//! Dynamic values
//!
//! A tagged value for stores whose kind is chosen at runtime.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::Result;

use super::{read_f32, read_f64, read_i64, read_text, read_u64, StoreValue, ValueKind};

/// A value whose kind is known only at runtime
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float32(f32),
    Float64(f64),
    Text(String),
}

impl StoreValue for Value {
    const DECLARED_KIND: Option<ValueKind> = None;

    fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Uint(_) => ValueKind::Uint,
            Value::Float32(_) => ValueKind::Float32,
            Value::Float64(_) => ValueKind::Float64,
            Value::Text(_) => ValueKind::Text,
        }
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Value::Int(v) => buf.put_i64_le(*v),
            Value::Uint(v) => buf.put_u64_le(*v),
            Value::Float32(v) => buf.put_f32_le(*v),
            Value::Float64(v) => buf.put_f64_le(*v),
            Value::Text(s) => buf.put_slice(s.as_bytes()),
        }
    }

    fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Self> {
        Ok(match kind {
            ValueKind::Int => Value::Int(read_i64(bytes)?),
            ValueKind::Uint => Value::Uint(read_u64(bytes)?),
            ValueKind::Float32 => Value::Float32(read_f32(bytes)?),
            ValueKind::Float64 => Value::Float64(read_f64(bytes)?),
            ValueKind::Text => Value::Text(read_text(bytes)?),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
