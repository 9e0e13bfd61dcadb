//! Scalar values and typed column buffers.
//!
//! `Value` is the per-cell view handed out by the store cursor. `ColumnData`
//! is the owned column buffer that record files encode and decode.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::ColumnType;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Bool(bool),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::I8(_) => ColumnType::I8,
            Value::U8(_) => ColumnType::U8,
            Value::I16(_) => ColumnType::I16,
            Value::U16(_) => ColumnType::U16,
            Value::I32(_) => ColumnType::I32,
            Value::U32(_) => ColumnType::U32,
            Value::I64(_) => ColumnType::I64,
            Value::U64(_) => ColumnType::U64,
            Value::Bool(_) => ColumnType::Bool,
            Value::F32(_) => ColumnType::F32,
            Value::F64(_) => ColumnType::F64,
        }
    }

    /// Zero of the given type; the cell content before the first row load.
    pub fn zero(ty: ColumnType) -> Self {
        match ty {
            ColumnType::I8 => Value::I8(0),
            ColumnType::U8 => Value::U8(0),
            ColumnType::I16 => Value::I16(0),
            ColumnType::U16 => Value::U16(0),
            ColumnType::I32 => Value::I32(0),
            ColumnType::U32 => Value::U32(0),
            ColumnType::I64 => Value::I64(0),
            ColumnType::U64 => Value::U64(0),
            ColumnType::Bool => Value::Bool(false),
            ColumnType::F32 => Value::F32(0.0),
            ColumnType::F64 => Value::F64(0.0),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::I8(v) => v as f64,
            Value::U8(v) => v as f64,
            Value::I16(v) => v as f64,
            Value::U16(v) => v as f64,
            Value::I32(v) => v as f64,
            Value::U32(v) => v as f64,
            Value::I64(v) => v as f64,
            Value::U64(v) => v as f64,
            Value::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
            Value::F32(v) => v as f64,
            Value::F64(v) => v,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            Value::I8(v) => v as i64,
            Value::U8(v) => v as i64,
            Value::I16(v) => v as i64,
            Value::U16(v) => v as i64,
            Value::I32(v) => v as i64,
            Value::U32(v) => v as i64,
            Value::I64(v) => v,
            Value::U64(v) => v as i64,
            Value::Bool(v) => v as i64,
            Value::F32(v) => v as i64,
            Value::F64(v) => v as i64,
        }
    }

    /// Nonzero numbers are true, matching how decision flags are stored.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(v) => v,
            Value::F32(v) => v != 0.0,
            Value::F64(v) => v != 0.0,
            other => other.as_i64() != 0,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// Owned, typed column buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    Bool(Vec<bool>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! each_variant {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            ColumnData::I8($v) => $body,
            ColumnData::U8($v) => $body,
            ColumnData::I16($v) => $body,
            ColumnData::U16($v) => $body,
            ColumnData::I32($v) => $body,
            ColumnData::U32($v) => $body,
            ColumnData::I64($v) => $body,
            ColumnData::U64($v) => $body,
            ColumnData::Bool($v) => $body,
            ColumnData::F32($v) => $body,
            ColumnData::F64($v) => $body,
        }
    };
}

impl ColumnData {
    pub fn with_capacity(ty: ColumnType, cap: usize) -> Self {
        match ty {
            ColumnType::I8 => ColumnData::I8(Vec::with_capacity(cap)),
            ColumnType::U8 => ColumnData::U8(Vec::with_capacity(cap)),
            ColumnType::I16 => ColumnData::I16(Vec::with_capacity(cap)),
            ColumnType::U16 => ColumnData::U16(Vec::with_capacity(cap)),
            ColumnType::I32 => ColumnData::I32(Vec::with_capacity(cap)),
            ColumnType::U32 => ColumnData::U32(Vec::with_capacity(cap)),
            ColumnType::I64 => ColumnData::I64(Vec::with_capacity(cap)),
            ColumnType::U64 => ColumnData::U64(Vec::with_capacity(cap)),
            ColumnType::Bool => ColumnData::Bool(Vec::with_capacity(cap)),
            ColumnType::F32 => ColumnData::F32(Vec::with_capacity(cap)),
            ColumnType::F64 => ColumnData::F64(Vec::with_capacity(cap)),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::I8(_) => ColumnType::I8,
            ColumnData::U8(_) => ColumnType::U8,
            ColumnData::I16(_) => ColumnType::I16,
            ColumnData::U16(_) => ColumnType::U16,
            ColumnData::I32(_) => ColumnType::I32,
            ColumnData::U32(_) => ColumnType::U32,
            ColumnData::I64(_) => ColumnType::I64,
            ColumnData::U64(_) => ColumnType::U64,
            ColumnData::Bool(_) => ColumnType::Bool,
            ColumnData::F32(_) => ColumnType::F32,
            ColumnData::F64(_) => ColumnType::F64,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<Value> {
        Some(match self {
            ColumnData::I8(v) => Value::I8(*v.get(idx)?),
            ColumnData::U8(v) => Value::U8(*v.get(idx)?),
            ColumnData::I16(v) => Value::I16(*v.get(idx)?),
            ColumnData::U16(v) => Value::U16(*v.get(idx)?),
            ColumnData::I32(v) => Value::I32(*v.get(idx)?),
            ColumnData::U32(v) => Value::U32(*v.get(idx)?),
            ColumnData::I64(v) => Value::I64(*v.get(idx)?),
            ColumnData::U64(v) => Value::U64(*v.get(idx)?),
            ColumnData::Bool(v) => Value::Bool(*v.get(idx)?),
            ColumnData::F32(v) => Value::F32(*v.get(idx)?),
            ColumnData::F64(v) => Value::F64(*v.get(idx)?),
        })
    }

    /// Append a value, converting it to this column's type.
    pub fn push(&mut self, value: Value) {
        match self {
            ColumnData::I8(v) => v.push(value.as_i64() as i8),
            ColumnData::U8(v) => v.push(value.as_i64() as u8),
            ColumnData::I16(v) => v.push(value.as_i64() as i16),
            ColumnData::U16(v) => v.push(value.as_i64() as u16),
            ColumnData::I32(v) => v.push(value.as_i64() as i32),
            ColumnData::U32(v) => v.push(value.as_i64() as u32),
            ColumnData::I64(v) => v.push(value.as_i64()),
            ColumnData::U64(v) => v.push(value.as_i64() as u64),
            ColumnData::Bool(v) => v.push(value.as_bool()),
            ColumnData::F32(v) => v.push(value.as_f64() as f32),
            ColumnData::F64(v) => v.push(value.as_f64()),
        }
    }

    /// Little-endian encoding, `width()` bytes per value; bools as 0/1.
    pub fn encode_le(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.column_type().width());
        match self {
            ColumnData::Bool(v) => out.extend(v.iter().map(|&b| b as u8)),
            ColumnData::I8(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            ColumnData::U8(v) => out.extend_from_slice(v),
            ColumnData::I16(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            ColumnData::U16(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            ColumnData::I32(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            ColumnData::U32(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            ColumnData::I64(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            ColumnData::U64(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            ColumnData::F32(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            ColumnData::F64(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
        }
        out
    }

    pub fn decode_le(ty: ColumnType, bytes: &[u8]) -> Result<Self> {
        let width = ty.width();
        if bytes.len() % width != 0 {
            return Err(Error::Schema(format!(
                "column block of {} bytes is not a multiple of {width}",
                bytes.len()
            )));
        }
        macro_rules! decode {
            ($variant:ident, $t:ty) => {
                ColumnData::$variant(
                    bytes
                        .chunks_exact(width)
                        .map(|c| {
                            let mut buf = [0u8; std::mem::size_of::<$t>()];
                            buf.copy_from_slice(c);
                            <$t>::from_le_bytes(buf)
                        })
                        .collect(),
                )
            };
        }
        Ok(match ty {
            ColumnType::Bool => ColumnData::Bool(bytes.iter().map(|&b| b != 0).collect()),
            ColumnType::U8 => ColumnData::U8(bytes.to_vec()),
            ColumnType::I8 => decode!(I8, i8),
            ColumnType::I16 => decode!(I16, i16),
            ColumnType::U16 => decode!(U16, u16),
            ColumnType::I32 => decode!(I32, i32),
            ColumnType::U32 => decode!(U32, u32),
            ColumnType::I64 => decode!(I64, i64),
            ColumnType::U64 => decode!(U64, u64),
            ColumnType::F32 => decode!(F32, f32),
            ColumnType::F64 => decode!(F64, f64),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A set of equally long columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Errors when the columns disagree on length.
    pub fn validate(&self) -> Result<()> {
        let n = self.num_rows();
        for c in &self.columns {
            if c.len() != n {
                return Err(Error::Invariant(format!(
                    "column '{}' has {} rows, expected {n}",
                    c.name,
                    c.len()
                )));
            }
        }
        Ok(())
    }
}
