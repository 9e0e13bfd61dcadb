#![forbid(unsafe_code)]
//! lcyield-meta: the `MetaTree` friend of an event store.
//!
//! For each store row the builder derives selection flags, sWeights from a
//! fit of the selected candidates, a uniform random number and the
//! phase-space variables of the decay. The result is written once per
//! dataset key and reattached on later runs.

pub mod builder;
pub mod error;
pub mod fit;
pub mod kinematics;
pub mod sideband;
pub mod sweights;

pub use builder::{attach_meta, meta_path, MetaBuilder, MetaOutcome, MetaSummary, MASS_TOLERANCE};
pub use error::{Error, Result};
pub use fit::{
    check_quality, signal_region_yields, Component, FittedModel, MassFitter, SWeightRow,
    SignalRegionYields,
};
pub use kinematics::{DecayMomenta, LorentzVector, PhaseSpace};
pub use sideband::{SidebandFitter, SidebandModel, SIGNAL_WINDOW};
pub use sweights::SWeightFile;
