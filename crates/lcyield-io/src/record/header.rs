//! Record file header and column directory.
//!
//! Layout on disk:
//! [ magic: u32 ][ version: u16 ][ codec: u8 ][ reserved: u8 ]
//! [ n_rows: u64 ][ directory_len: u64 ]
//! [ directory JSON ][ column blocks … ]
//!
//! Block offsets in the directory are relative to the first byte after the
//! directory. Each block carries a blake3 checksum of its stored bytes.

use lcyield_core::hash::Hash256;
use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::{Error, Result};

pub const MAGIC: u32 = 0x4C43_5952; // "LCYR"
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 8 + 8;

/// Upper bound on the directory size we are willing to allocate for.
const MAX_DIRECTORY_LEN: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub codec: Codec,
    pub n_rows: u64,
    pub directory_len: u64,
}

impl RecordHeader {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.push(self.codec as u8);
        out.push(0u8); // reserved
        out.extend_from_slice(&self.n_rows.to_le_bytes());
        out.extend_from_slice(&self.directory_len.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Storage("short header".into()));
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if magic != MAGIC || version != VERSION {
            return Err(Error::Storage("bad magic/version".into()));
        }
        let codec = Codec::from_u8(bytes[6])?;
        // bytes[7] reserved
        let n_rows = read_u64(&bytes[8..16]);
        let directory_len = read_u64(&bytes[16..24]);
        if directory_len > MAX_DIRECTORY_LEN {
            return Err(Error::Storage(format!(
                "directory length {directory_len} exceeds max {MAX_DIRECTORY_LEN}"
            )));
        }
        Ok(Self {
            codec,
            n_rows,
            directory_len,
        })
    }
}

fn read_u64(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    u64::from_le_bytes(buf)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    /// Leaf type code, `"D"` or `"F[4]"`.
    pub type_code: String,
    pub offset: u64,
    pub stored_len: u64,
    pub raw_len: u64,
    pub checksum: Hash256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub columns: Vec<ColumnEntry>,
}
