#![forbid(unsafe_code)]
//! lcyield-stats: efficiencies and their uncertainties.
//!
//! - [`efficiency`]: count ratios and uncertainty arithmetic
//! - [`hist2d`]: reference tables and (momentum, pseudorapidity) spectra
//! - [`reweight`]: filling spectra from a store and reweighting a table
//! - [`toys`]: seeded smearing of a table by its errors
//! - [`tabulated`]: efficiencies measured by external tools

pub mod efficiency;
pub mod error;
pub mod hist2d;
pub mod reweight;
pub mod tabulated;
pub mod toys;

pub use efficiency::{
    aggregate_by_polarity, efficiency_from_counts, significance, yield_ratio, EfficiencyResult,
};
pub use error::{Error, Result};
pub use hist2d::{Axis, ReferenceTable, Spectrum};
pub use reweight::{
    build_spectra, build_spectrum, lookup, total_efficiency, tracking_efficiency, TRACKING_TRACKS,
};
pub use tabulated::{acceptance_efficiency, pid_efficiency};
pub use toys::{run_n_toys, run_toy, seeded_rng};
