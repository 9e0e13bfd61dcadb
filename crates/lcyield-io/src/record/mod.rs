//! Columnar record files: one block per column, read column by column.

pub mod header;
mod reader;
mod writer;

pub use header::{ColumnEntry, RecordHeader, HEADER_LEN, MAGIC};
pub use reader::RecordFile;
pub use writer::RecordFileWriter;
