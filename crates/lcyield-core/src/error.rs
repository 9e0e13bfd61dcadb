use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown dataset key component: {0}")]
    UnknownKey(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

