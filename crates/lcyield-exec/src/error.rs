use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    Invalid(String),

    #[error(transparent)]
    Core(#[from] lcyield_core::error::Error),

    #[error(transparent)]
    Io(#[from] lcyield_io::Error),

    #[error(transparent)]
    Store(#[from] lcyield_store::Error),

    #[error(transparent)]
    Selection(#[from] lcyield_selection::Error),

    #[error(transparent)]
    Stats(#[from] lcyield_stats::Error),

    #[error(transparent)]
    Meta(#[from] lcyield_meta::Error),

    #[error("file system: {0}")]
    Fs(#[from] std::io::Error),

    #[error("report: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExecError>;
