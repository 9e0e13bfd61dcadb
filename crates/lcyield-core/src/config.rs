//! Analysis configuration that downstream crates can serialize/deserialize.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Root of the `Collision/` and `MonteCarlo/` trees.
    pub data_dir: PathBuf,

    /// Where derived friend files and reports are written.
    pub output_dir: PathBuf,

    /// Parent directory for scoped temporary copies.
    pub scratch_dir: PathBuf,

    /// ProbNN PID thresholds when true, DLL thresholds otherwise.
    pub use_probnn: bool,

    /// Seed for the `random` meta column. 0 draws from system entropy.
    pub seed: u64,

    /// Log iteration progress every 5% of rows.
    pub show_progress: bool,

    /// Use the 17b stripping (and its column naming) for 2011.
    pub legacy_2011: bool,

    /// Factor applied to momenta before spectrum lookup (MeV -> GeV).
    pub momentum_scale: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            scratch_dir: std::env::temp_dir(),
            use_probnn: true,
            seed: 0,
            show_progress: false,
            legacy_2011: false,
            momentum_scale: 1e-3,
        }
    }
}

impl AnalysisConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `LCYIELD_DATA_DIR`, `LCYIELD_OUTPUT_DIR`, `LCYIELD_SCRATCH_DIR`: paths
    /// - `LCYIELD_USE_PROBNN`: `true`/`false`
    /// - `LCYIELD_SEED`: random seed
    /// - `LCYIELD_SHOW_PROGRESS`: `true`/`false`
    /// - `LCYIELD_LEGACY_2011`: `true`/`false`
    /// - `LCYIELD_MOMENTUM_SCALE`: float factor
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(s) = get("LCYIELD_DATA_DIR") {
            cfg.data_dir = PathBuf::from(s);
        }

        if let Some(s) = get("LCYIELD_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(s);
        }

        if let Some(s) = get("LCYIELD_SCRATCH_DIR") {
            cfg.scratch_dir = PathBuf::from(s);
        }

        if let Some(v) = get("LCYIELD_USE_PROBNN").and_then(|s| parse_flag(&s)) {
            cfg.use_probnn = v;
        }

        if let Some(s) = get("LCYIELD_SEED") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.seed = v;
            }
        }

        if let Some(v) = get("LCYIELD_SHOW_PROGRESS").and_then(|s| parse_flag(&s)) {
            cfg.show_progress = v;
        }

        if let Some(v) = get("LCYIELD_LEGACY_2011").and_then(|s| parse_flag(&s)) {
            cfg.legacy_2011 = v;
        }

        if let Some(s) = get("LCYIELD_MOMENTUM_SCALE") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.momentum_scale = v;
            }
        }

        cfg
    }

    /// Reject settings no workflow can run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.momentum_scale.is_finite() && self.momentum_scale > 0.0) {
            return Err(Error::Config(format!(
                "momentum_scale must be positive, got {}",
                self.momentum_scale
            )));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Config("output_dir is empty".into()));
        }
        Ok(())
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
