use lcyield_core::hash::hash_bytes;
use lcyield_core::schema::TypeCode;
use lcyield_core::types::{ColumnData, RowBatch};

use crate::codec::{self, Codec};
use crate::error::{Error, Result};
use crate::record::header::{ColumnEntry, Directory, RecordHeader};
use crate::storage::Storage;

struct PendingColumn {
    name: String,
    code: TypeCode,
    data: ColumnData,
}

/// Accumulates equally long columns and writes them as one record file.
pub struct RecordFileWriter {
    codec: Codec,
    n_rows: Option<usize>,
    columns: Vec<PendingColumn>,
}

impl RecordFileWriter {
    pub fn new(codec: Codec) -> Self {
        Self {
            codec,
            n_rows: None,
            columns: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows.unwrap_or(0)
    }

    fn check_rows(&mut self, name: &str, rows: usize) -> Result<()> {
        if self.columns.iter().any(|c| c.name == name) {
            return Err(Error::Schema(format!("duplicate column '{name}'")));
        }
        match self.n_rows {
            Some(n) if n != rows => Err(Error::Schema(format!(
                "column '{name}' has {rows} rows, expected {n}"
            ))),
            _ => {
                self.n_rows = Some(rows);
                Ok(())
            }
        }
    }

    pub fn add_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        self.check_rows(&name, data.len())?;
        self.columns.push(PendingColumn {
            code: TypeCode::Scalar(data.column_type()),
            name,
            data,
        });
        Ok(())
    }

    /// Fixed-width array column; `data` is row-major with `len` values per row.
    pub fn add_array_column(
        &mut self,
        name: impl Into<String>,
        len: usize,
        data: ColumnData,
    ) -> Result<()> {
        let name = name.into();
        if len == 0 || data.len() % len != 0 {
            return Err(Error::Schema(format!(
                "array column '{name}' of {} values is not a multiple of {len}",
                data.len()
            )));
        }
        self.check_rows(&name, data.len() / len)?;
        self.columns.push(PendingColumn {
            code: TypeCode::Array {
                elem: data.column_type(),
                len,
            },
            name,
            data,
        });
        Ok(())
    }

    pub fn add_batch(&mut self, batch: RowBatch) -> Result<()> {
        for col in batch.columns {
            self.add_column(col.name, col.data)?;
        }
        Ok(())
    }

    pub fn encode(self) -> Result<Vec<u8>> {
        let mut directory = Directory::default();
        let mut blocks = Vec::new();
        for col in &self.columns {
            let raw = col.data.encode_le();
            let stored = codec::compress(self.codec, &raw)?;
            directory.columns.push(ColumnEntry {
                name: col.name.clone(),
                type_code: col.code.to_string(),
                offset: blocks.len() as u64,
                stored_len: stored.len() as u64,
                raw_len: raw.len() as u64,
                checksum: hash_bytes(&stored),
            });
            blocks.extend_from_slice(&stored);
        }

        let dir_bytes = serde_json::to_vec(&directory)
            .map_err(|e| Error::Codec(format!("directory serialize: {e}")))?;
        let header = RecordHeader {
            codec: self.codec,
            n_rows: self.n_rows() as u64,
            directory_len: dir_bytes.len() as u64,
        };

        let mut out = header.to_bytes();
        out.extend_from_slice(&dir_bytes);
        out.extend_from_slice(&blocks);
        Ok(out)
    }

    /// Encode and write to `path`. Returns the number of rows written.
    pub fn write(self, storage: &dyn Storage, path: &str) -> Result<u64> {
        let n_rows = self.n_rows() as u64;
        let bytes = self.encode()?;
        storage.write(path, &bytes)?;
        tracing::debug!(path, n_rows, bytes = bytes.len(), "wrote record file");
        Ok(n_rows)
    }
}
