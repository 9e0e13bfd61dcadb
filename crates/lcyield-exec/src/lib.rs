#![forbid(unsafe_code)]
//! lcyield-exec: the analysis runtime.
//!
//! [`Analysis`] opens datasets by key from the on-disk layout and runs the
//! efficiency workflows, the luminosity sum and the meta build over them.
//! Results gather in a [`Report`] that serializes to JSON.

pub mod efficiencies;
pub mod error;
pub mod layout;
pub mod lumi;
pub mod report;
pub mod runtime;

pub use error::{ExecError, Result};
pub use layout::DataLayout;
pub use lumi::{Luminosity, LUMI_COLUMN, LUMI_ERROR_COLUMN};
pub use report::{
    BranchingEntry, EfficiencyEntry, EfficiencyKind, LuminosityEntry, Report, YieldEntry,
    PKPI_BRANCHING_FRACTION,
};
pub use runtime::{Analysis, DEFAULT_TOYS, TRACKING_TABLE_FILE};
