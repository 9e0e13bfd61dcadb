use thiserror::Error;

/// Result type local to lcyield-io.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("unsupported codec: {0}")]
    CodecUnsupported(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("checksum mismatch in column '{0}'")]
    ChecksumMismatch(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error(transparent)]
    Core(#[from] lcyield_core::error::Error),
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Csv(e.to_string())
    }
}
