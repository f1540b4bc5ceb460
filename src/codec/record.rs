//! Record layout
//!
//! Builds the byte image of one `[keyLen][key][valueLen][value]` record.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{KvError, Result};

/// Width of each length prefix
pub const LEN_FIELD_SIZE: usize = 2;

/// Largest key or value a length prefix can describe
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// A record ready to be copied into the log region
#[derive(Debug, Clone)]
pub struct EncodedRecord {
    /// Full record bytes
    pub bytes: Bytes,

    /// Position of the value-length field, relative to the record start
    pub value_len_offset: usize,
}

impl EncodedRecord {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True for a zero-length value record
    pub fn is_tombstone(&self) -> bool {
        self.bytes.len() == self.value_len_offset + LEN_FIELD_SIZE
    }
}

/// Lay out a record; `None` writes a tombstone
pub fn encode_record(key: &str, value: Option<&[u8]>) -> Result<EncodedRecord> {
    let key_bytes = key.as_bytes();
    if key_bytes.len() > MAX_FIELD_LEN {
        return Err(KvError::KeyTooLarge(key_bytes.len()));
    }

    let value = value.unwrap_or_default();
    if value.len() > MAX_FIELD_LEN {
        return Err(KvError::ValueTooLarge(value.len()));
    }

    let mut buf = BytesMut::with_capacity(2 * LEN_FIELD_SIZE + key_bytes.len() + value.len());
    buf.put_u16_le(key_bytes.len() as u16);
    buf.put_slice(key_bytes);
    let value_len_offset = buf.len();
    buf.put_u16_le(value.len() as u16);
    buf.put_slice(value);

    Ok(EncodedRecord {
        bytes: buf.freeze(),
        value_len_offset,
    })
}
