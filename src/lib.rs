#![forbid(unsafe_code)]
//! lcyield: signal yields and selection efficiencies for Λc → p h h decays
//! in semileptonic Λb decays, computed from columnar event data.
//!
//! This facade re-exports the workspace crates; see each for details.

pub use lcyield_core as core;
pub use lcyield_exec as exec;
pub use lcyield_io as io;
pub use lcyield_meta as meta;
pub use lcyield_selection as selection;
pub use lcyield_stats as stats;
pub use lcyield_store as store;

pub use lcyield_core::prelude::*;
pub use lcyield_exec::{Analysis, EfficiencyKind, Report};
pub use lcyield_selection::{Candidate, SelectionConfig};
pub use lcyield_stats::EfficiencyResult;
pub use lcyield_store::EventStore;
