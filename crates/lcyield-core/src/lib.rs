#![forbid(unsafe_code)]
//! lcyield-core: shared vocabulary for the yield/efficiency workspace.
//!
//! Pure data and small helpers only. No file access lives here; the IO crate
//! owns storage and the store crate owns row iteration.

pub mod config;
pub mod error;
pub mod hash;
pub mod keys;
pub mod prelude;
pub mod schema;
pub mod types;

/// Version string stamped into derived files and reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
