//! Store header
//!
//! Fixed-layout metadata at offset 0 of the log region.

use crate::codec::ValueKind;
use crate::error::{KvError, Result};

/// Current on-disk format version
pub const FORMAT_VERSION: u8 = 1;

/// Header size: version (1) + last_offset (4) + value kind (1)
pub const HEADER_SIZE: usize = 6;

/// Header stored at the start of the log region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Format version
    pub version: u8,

    /// One past the last committed record; the next append starts here
    pub last_offset: u32,

    /// Declared value kind of the store
    pub value_kind: ValueKind,
}

impl Header {
    /// Header of a freshly created, empty store
    pub fn new(value_kind: ValueKind) -> Self {
        Self {
            version: FORMAT_VERSION,
            last_offset: HEADER_SIZE as u32,
            value_kind,
        }
    }

    /// Serialize to the fixed little-endian layout
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = self.version;
        bytes[1..5].copy_from_slice(&self.last_offset.to_le_bytes());
        bytes[5] = self.value_kind.tag();
        bytes
    }

    /// Parse a header from the first bytes of a region
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(KvError::Decode(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let version = bytes[0];
        if version != FORMAT_VERSION {
            return Err(KvError::Decode(format!(
                "Unsupported format version: {}",
                version
            )));
        }

        let last_offset = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        let value_kind = ValueKind::from_tag(bytes[5])?;

        Ok(Self {
            version,
            last_offset,
            value_kind,
        })
    }
}
