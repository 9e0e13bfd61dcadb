use thiserror::Error;

/// Result type local to lcyield-selection.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("mode {0} has no simulated signal sample")]
    NoMonteCarlo(lcyield_core::keys::DecayMode),

    #[error(transparent)]
    Store(#[from] lcyield_store::Error),
}
