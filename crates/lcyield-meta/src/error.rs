use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// sWeights no longer line up with the candidates they were fitted to.
    #[error("sWeights mismatch: {0}")]
    Mismatch(String),

    #[error("store '{0}' already carries derived columns")]
    AlreadyAttached(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("fit: {0}")]
    Fit(String),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] lcyield_io::Error),

    #[error(transparent)]
    Store(#[from] lcyield_store::Error),

    #[error(transparent)]
    Selection(#[from] lcyield_selection::Error),
}
