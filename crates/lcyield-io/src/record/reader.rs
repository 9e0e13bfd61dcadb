use std::sync::Arc;

use lcyield_core::hash::hash_bytes;
use lcyield_core::schema::{Field, Schema, TypeCode};
use lcyield_core::types::ColumnData;

use crate::codec;
use crate::error::{Error, Result};
use crate::record::header::{ColumnEntry, Directory, RecordHeader, HEADER_LEN};
use crate::storage::Storage;

/// An opened record file. Only the header and directory are read on open;
/// column blocks are fetched on demand.
#[derive(Clone)]
pub struct RecordFile {
    path: String,
    storage: Arc<dyn Storage>,
    header: RecordHeader,
    entries: Vec<(ColumnEntry, TypeCode)>,
    data_start: u64,
}

impl std::fmt::Debug for RecordFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordFile")
            .field("path", &self.path)
            .field("n_rows", &self.header.n_rows)
            .field("columns", &self.entries.len())
            .finish()
    }
}

impl RecordFile {
    /// Open `path`, parsing every directory type code. An unknown code fails
    /// here rather than on first access.
    pub fn open(storage: Arc<dyn Storage>, path: &str) -> Result<Self> {
        let header_bytes = storage.read_range(path, 0, HEADER_LEN)?;
        let header = RecordHeader::from_bytes(&header_bytes)?;
        let dir_bytes = storage.read_range(
            path,
            HEADER_LEN as u64,
            header.directory_len as usize,
        )?;
        let directory: Directory = serde_json::from_slice(&dir_bytes)
            .map_err(|e| Error::Codec(format!("directory deserialize: {e}")))?;

        let entries = directory
            .columns
            .into_iter()
            .map(|e| {
                let code = TypeCode::parse(&e.type_code).map_err(|err| {
                    Error::Schema(format!("{path}: column '{}': {err}", e.name))
                })?;
                Ok((e, code))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path: path.to_string(),
            storage,
            data_start: HEADER_LEN as u64 + header.directory_len,
            header,
            entries,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn n_rows(&self) -> u64 {
        self.header.n_rows
    }

    /// Scalar columns only; array columns cannot be bound to a cell.
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.entries
                .iter()
                .filter_map(|(e, code)| match code {
                    TypeCode::Scalar(t) => Some(Field::new(e.name.clone(), *t)),
                    TypeCode::Array { .. } => None,
                })
                .collect(),
        )
    }

    pub fn array_columns(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, code)| code.is_array())
            .map(|(e, _)| e.name.as_str())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.entries.iter().any(|(e, _)| e.name == name)
    }

    fn read_block(&self, entry: &ColumnEntry) -> Result<Vec<u8>> {
        let stored = self.storage.read_range(
            &self.path,
            self.data_start + entry.offset,
            entry.stored_len as usize,
        )?;
        if hash_bytes(&stored) != entry.checksum {
            return Err(Error::ChecksumMismatch(entry.name.clone()));
        }
        let raw = codec::decompress(self.header.codec, &stored)?;
        if raw.len() as u64 != entry.raw_len {
            return Err(Error::Codec(format!(
                "column '{}' decoded to {} bytes, expected {}",
                entry.name,
                raw.len(),
                entry.raw_len
            )));
        }
        Ok(raw)
    }

    pub fn read_column(&self, name: &str) -> Result<ColumnData> {
        let (entry, code) = self
            .entries
            .iter()
            .find(|(e, _)| e.name == name)
            .ok_or_else(|| Error::Schema(format!("{}: no column '{name}'", self.path)))?;
        let ty = match code {
            TypeCode::Scalar(t) => *t,
            TypeCode::Array { .. } => {
                return Err(Error::Schema(format!(
                    "column '{name}' is an array column ({code})"
                )))
            }
        };
        let raw = self.read_block(entry)?;
        let data = ColumnData::decode_le(ty, &raw)?;
        if data.len() as u64 != self.header.n_rows {
            return Err(Error::Schema(format!(
                "column '{name}' holds {} rows, header says {}",
                data.len(),
                self.header.n_rows
            )));
        }
        Ok(data)
    }
}
