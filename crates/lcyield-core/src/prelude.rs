//! Convenient re-exports for downstream crates.

pub use crate::config::AnalysisConfig;
pub use crate::error::{Error, Result};
pub use crate::hash::{hash_bytes, Hash256};
pub use crate::keys::{DatasetKey, DecayMode, McType, Polarity, Stripping, Year, META_FRIEND_NAME};
pub use crate::schema::{ColumnType, Field, Schema, TypeCode};
pub use crate::types::{Column, ColumnData, RowBatch, Value};
