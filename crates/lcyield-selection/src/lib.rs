#![forbid(unsafe_code)]
//! lcyield-selection: selection predicates for Λc → p h h candidates.
//!
//! The six decay modes are described by a static [`VariantSpec`] table; the
//! checks they share are free functions, and a [`Candidate`] binds the
//! columns a mode needs to an event store once so every predicate reads the
//! current row through cells.

pub mod candidate;
pub mod columns;
pub mod error;
pub mod variant;

pub use candidate::{Candidate, TriggerLines};
pub use columns::{
    proton_pid_columns, required_columns, Decision, TriggerNaming, META_COLUMNS, TRUTH_MATCH_CUT,
};
pub use error::{Error, Result};
pub use variant::{FitShapes, PidCuts, PidScheme, Shape, Threshold, VariantSpec};

use lcyield_core::config::AnalysisConfig;
use lcyield_core::keys::DatasetKey;

/// How a [`Candidate`] is bound and judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionConfig {
    pub pid: PidScheme,
    pub trigger_naming: TriggerNaming,
    /// Bind the truth-matching columns.
    pub mc: bool,
    /// Bind the derived meta columns.
    pub with_meta: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            pid: PidScheme::ProbNN,
            trigger_naming: TriggerNaming::Standard,
            mc: false,
            with_meta: false,
        }
    }
}

impl SelectionConfig {
    pub fn for_key(key: &DatasetKey, cfg: &AnalysisConfig) -> Self {
        Self {
            pid: if cfg.use_probnn {
                PidScheme::ProbNN
            } else {
                PidScheme::Dll
            },
            trigger_naming: if key.stripping.is_legacy() {
                TriggerNaming::Legacy
            } else {
                TriggerNaming::Standard
            },
            mc: key.mc,
            with_meta: false,
        }
    }

    pub fn with_meta(self, with_meta: bool) -> Self {
        Self { with_meta, ..self }
    }
}
