use thiserror::Error;

/// Result type local to lcyield-store.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("friend '{friend}' has {found} rows, primary table has {expected}")]
    Mismatch {
        friend: String,
        expected: u64,
        found: u64,
    },

    #[error("column '{0}' is not active")]
    InactiveColumn(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("entry {entry} out of range (store has {entries} entries)")]
    EntryOutOfRange { entry: u64, entries: u64 },

    #[error("no current entry; iterate or set_entry first")]
    NoEntry,

    #[error("invalid cut '{cut}': {reason}")]
    Cut { cut: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("scratch area: {0}")]
    Scratch(String),

    #[error(transparent)]
    Io(lcyield_io::Error),
}

impl From<lcyield_io::Error> for Error {
    fn from(e: lcyield_io::Error) -> Self {
        match e {
            lcyield_io::Error::NotFound(p) => Error::NotFound(p),
            lcyield_io::Error::Schema(s) => Error::Schema(s),
            other => Error::Io(other),
        }
    }
}

impl From<lcyield_core::error::Error> for Error {
    fn from(e: lcyield_core::error::Error) -> Self {
        Error::Schema(e.to_string())
    }
}
