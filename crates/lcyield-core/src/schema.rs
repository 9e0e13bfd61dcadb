//! Column types and schemas. Pure data.
//!
//! Type codes follow the classic one-letter leaf convention used by the
//! ntuples this workspace reads: `B b S s I i L l O F D`. A code with a `[n]`
//! suffix (for example `D[4]`) describes a fixed-width array column.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Bool,
    F32,
    F64,
}

impl ColumnType {
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'B' => ColumnType::I8,
            'b' => ColumnType::U8,
            'S' => ColumnType::I16,
            's' => ColumnType::U16,
            'I' => ColumnType::I32,
            'i' => ColumnType::U32,
            'L' => ColumnType::I64,
            'l' => ColumnType::U64,
            'O' => ColumnType::Bool,
            'F' => ColumnType::F32,
            'D' => ColumnType::F64,
            _ => return None,
        })
    }

    pub fn code(self) -> char {
        match self {
            ColumnType::I8 => 'B',
            ColumnType::U8 => 'b',
            ColumnType::I16 => 'S',
            ColumnType::U16 => 's',
            ColumnType::I32 => 'I',
            ColumnType::U32 => 'i',
            ColumnType::I64 => 'L',
            ColumnType::U64 => 'l',
            ColumnType::Bool => 'O',
            ColumnType::F32 => 'F',
            ColumnType::F64 => 'D',
        }
    }

    /// Width of one encoded value in bytes.
    pub fn width(self) -> usize {
        match self {
            ColumnType::I8 | ColumnType::U8 | ColumnType::Bool => 1,
            ColumnType::I16 | ColumnType::U16 => 2,
            ColumnType::I32 | ColumnType::U32 | ColumnType::F32 => 4,
            ColumnType::I64 | ColumnType::U64 | ColumnType::F64 => 8,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A parsed type code: either a scalar or a fixed-width array of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Scalar(ColumnType),
    Array { elem: ColumnType, len: usize },
}

impl TypeCode {
    /// Parse `"D"`, `"I"`, `"F[3]"`, ... Anything else is a schema error.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        let (head, array_len) = match code.find('[') {
            Some(open) => {
                let inner = code[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| Error::Schema(format!("malformed array type code '{code}'")))?;
                let len = inner
                    .parse::<usize>()
                    .map_err(|_| Error::Schema(format!("malformed array length in '{code}'")))?;
                (&code[..open], Some(len))
            }
            None => (code, None),
        };

        let mut chars = head.chars();
        let elem = match (chars.next(), chars.next()) {
            (Some(c), None) => ColumnType::from_code(c)
                .ok_or_else(|| Error::Schema(format!("unrecognized column type code '{code}'")))?,
            _ => return Err(Error::Schema(format!("unrecognized column type code '{code}'"))),
        };

        Ok(match array_len {
            Some(len) => TypeCode::Array { elem, len },
            None => TypeCode::Scalar(elem),
        })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeCode::Array { .. })
    }

    pub fn elem(&self) -> ColumnType {
        match *self {
            TypeCode::Scalar(t) => t,
            TypeCode::Array { elem, .. } => elem,
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeCode::Scalar(t) => write!(f, "{t}"),
            TypeCode::Array { elem, len } => write!(f, "{elem}[{len}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub column_type: ColumnType,
}

impl Field {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
