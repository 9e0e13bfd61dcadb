//! Byte-level storage adapters used by record files.
//!
//! - `fs`: local filesystem (default).
//! - `memory`: HashMap-backed storage for tests and benchmarks.

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Abstract storage interface for record files.
pub trait Storage: Send + Sync {
    /// Write bytes to a path. Creates parent directories if needed.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read exactly `len` bytes starting at `offset`. A missing path is `NotFound`.
    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Delete a path. Idempotent (no error if path doesn't exist).
    fn delete(&self, path: &str) -> Result<()>;

    fn exists(&self, path: &str) -> Result<bool>;

    /// Size of a path in bytes.
    fn size(&self, path: &str) -> Result<u64>;
}
