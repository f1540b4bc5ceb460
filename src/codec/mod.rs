//! Binary Codec Module
//!
//! Converts values and records to/from little-endian byte sequences.
//!
//! ## Responsibilities
//! - Normalize integers to 64 bits so payloads are width-independent
//! - Encode floats as IEEE-754 bit patterns, text as raw UTF-8
//! - Lay out length-prefixed records for the log region
//!
//! ## Record Format
//! ```text
//! ┌─────────────┬──────────┬───────────────┬────────────┐
//! │ KeyLen (2)  │   Key    │ ValueLen (2)  │   Value    │
//! └─────────────┴──────────┴───────────────┴────────────┘
//! ```
//! A `ValueLen` of zero marks a tombstone.
//!
//! Payloads carry no type tag: the reader names the kind it expects, and the
//! store-wide kind lives in the header.

mod value;
mod record;

pub use value::Value;
pub use record::{encode_record, EncodedRecord, LEN_FIELD_SIZE, MAX_FIELD_LEN};

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{KvError, Result};

/// Value kind tag recorded in the store header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    /// Signed integer, stored as i64
    Int = 1,
    /// Unsigned integer, stored as u64
    Uint = 2,
    Float32 = 3,
    Float64 = 4,
    /// UTF-8 text
    Text = 5,
}

impl ValueKind {
    /// Parse a header tag byte
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(ValueKind::Int),
            2 => Ok(ValueKind::Uint),
            3 => Ok(ValueKind::Float32),
            4 => Ok(ValueKind::Float64),
            5 => Ok(ValueKind::Text),
            _ => Err(KvError::Decode(format!("Unknown value kind tag: 0x{:02x}", tag))),
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Payload width for fixed-size kinds, `None` for text
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ValueKind::Int | ValueKind::Uint | ValueKind::Float64 => Some(8),
            ValueKind::Float32 => Some(4),
            ValueKind::Text => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Uint => "uint",
            ValueKind::Float32 => "float32",
            ValueKind::Float64 => "float64",
            ValueKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// A type that can be stored as a value
///
/// Implemented for the primitive integers, `f32`, `f64`, `String`, and the
/// dynamic [`Value`].
pub trait StoreValue: Sized + Clone + Send {
    /// Kind a store of this type declares, or `None` when it depends on
    /// configuration (dynamic values)
    const DECLARED_KIND: Option<ValueKind>;

    /// Kind of this particular value
    fn kind(&self) -> ValueKind;

    /// Append the raw payload bytes
    fn encode_into(&self, buf: &mut BytesMut);

    /// Rebuild a value from a payload written under `kind`
    fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Self>;
}

/// Encode a value payload, enforcing the record field limits
pub fn encode_value<T: StoreValue>(value: &T) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(value.kind().fixed_width().unwrap_or(16));
    value.encode_into(&mut buf);

    if buf.is_empty() {
        return Err(KvError::EmptyValue);
    }
    if buf.len() > MAX_FIELD_LEN {
        return Err(KvError::ValueTooLarge(buf.len()));
    }
    Ok(buf.freeze())
}

/// Decode a value payload written under `kind`
pub fn decode_value<T: StoreValue>(kind: ValueKind, bytes: &[u8]) -> Result<T> {
    T::decode(kind, bytes)
}

// =============================================================================
// Scalar helpers
// =============================================================================

fn ensure_kind(requested: ValueKind, stored: ValueKind) -> Result<()> {
    if requested != stored {
        return Err(KvError::Decode(format!(
            "stored kind is {}, requested {}",
            stored, requested
        )));
    }
    Ok(())
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        KvError::Decode(format!("expected {} payload bytes, got {}", N, bytes.len()))
    })
}

pub(crate) fn read_i64(bytes: &[u8]) -> Result<i64> {
    Ok(i64::from_le_bytes(fixed::<8>(bytes)?))
}

pub(crate) fn read_u64(bytes: &[u8]) -> Result<u64> {
    Ok(u64::from_le_bytes(fixed::<8>(bytes)?))
}

pub(crate) fn read_f32(bytes: &[u8]) -> Result<f32> {
    Ok(f32::from_le_bytes(fixed::<4>(bytes)?))
}

pub(crate) fn read_f64(bytes: &[u8]) -> Result<f64> {
    Ok(f64::from_le_bytes(fixed::<8>(bytes)?))
}

pub(crate) fn read_text(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| KvError::Decode(format!("invalid UTF-8 text: {}", e)))
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl StoreValue for $t {
            const DECLARED_KIND: Option<ValueKind> = Some(ValueKind::Int);

            fn kind(&self) -> ValueKind {
                ValueKind::Int
            }

            fn encode_into(&self, buf: &mut BytesMut) {
                buf.put_i64_le(*self as i64);
            }

            fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Self> {
                ensure_kind(ValueKind::Int, kind)?;
                let wide = read_i64(bytes)?;
                <$t>::try_from(wide).map_err(|_| {
                    KvError::Decode(format!("{} out of range for {}", wide, stringify!($t)))
                })
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl StoreValue for $t {
            const DECLARED_KIND: Option<ValueKind> = Some(ValueKind::Uint);

            fn kind(&self) -> ValueKind {
                ValueKind::Uint
            }

            fn encode_into(&self, buf: &mut BytesMut) {
                buf.put_u64_le(*self as u64);
            }

            fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Self> {
                ensure_kind(ValueKind::Uint, kind)?;
                let wide = read_u64(bytes)?;
                <$t>::try_from(wide).map_err(|_| {
                    KvError::Decode(format!("{} out of range for {}", wide, stringify!($t)))
                })
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u8, u16, u32, u64, usize);

impl StoreValue for f32 {
    const DECLARED_KIND: Option<ValueKind> = Some(ValueKind::Float32);

    fn kind(&self) -> ValueKind {
        ValueKind::Float32
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_f32_le(*self);
    }

    fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Self> {
        ensure_kind(ValueKind::Float32, kind)?;
        read_f32(bytes)
    }
}

impl StoreValue for f64 {
    const DECLARED_KIND: Option<ValueKind> = Some(ValueKind::Float64);

    fn kind(&self) -> ValueKind {
        ValueKind::Float64
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_f64_le(*self);
    }

    fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Self> {
        ensure_kind(ValueKind::Float64, kind)?;
        read_f64(bytes)
    }
}

impl StoreValue for String {
    const DECLARED_KIND: Option<ValueKind> = Some(ValueKind::Text);

    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(self.as_bytes());
    }

    fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Self> {
        ensure_kind(ValueKind::Text, kind)?;
        read_text(bytes)
    }
}
