#![forbid(unsafe_code)]
//! lcyield-io: storage adapters and the columnar record-file format.
//!
//! A generic `Storage` trait is implemented for the local filesystem and for
//! an in-memory map used in tests. Record files are written once and read
//! column by column, so a store only pays for the columns it activates.

pub mod codec;
pub mod error;
pub mod readers;
pub mod record;
pub mod storage;

pub use codec::Codec;
pub use error::{Error, Result};
pub use record::{ColumnEntry, RecordFile, RecordFileWriter};
pub use storage::{FsStorage, MemoryStorage, Storage};
