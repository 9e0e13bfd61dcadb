//! Efficiency and luminosity results of one run, with provenance.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use lcyield_core::config::AnalysisConfig;
use lcyield_core::hash::{hash_bytes, Hash256};
use lcyield_core::keys::{DatasetKey, DecayMode, Polarity, Stripping, Year};
use lcyield_stats::{significance, yield_ratio, EfficiencyResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExecError, Result};
use crate::lumi::Luminosity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyKind {
    Acceptance,
    Reconstruction,
    Stripping,
    Tracking,
    TrackingSmeared,
    Offline,
    Trigger,
    TriggerPreStripping,
    TriggerTisTos,
    OfflineData,
    Pid,
}

impl EfficiencyKind {
    pub const ALL: [EfficiencyKind; 11] = [
        EfficiencyKind::Acceptance,
        EfficiencyKind::Reconstruction,
        EfficiencyKind::Stripping,
        EfficiencyKind::Tracking,
        EfficiencyKind::TrackingSmeared,
        EfficiencyKind::Offline,
        EfficiencyKind::Trigger,
        EfficiencyKind::TriggerPreStripping,
        EfficiencyKind::TriggerTisTos,
        EfficiencyKind::OfflineData,
        EfficiencyKind::Pid,
    ];

    /// Factors of the total efficiency, in selection order.
    pub const CHAIN: [EfficiencyKind; 7] = [
        EfficiencyKind::Acceptance,
        EfficiencyKind::Reconstruction,
        EfficiencyKind::TrackingSmeared,
        EfficiencyKind::Stripping,
        EfficiencyKind::Trigger,
        EfficiencyKind::Offline,
        EfficiencyKind::Pid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EfficiencyKind::Acceptance => "acceptance",
            EfficiencyKind::Reconstruction => "reconstruction",
            EfficiencyKind::Stripping => "stripping",
            EfficiencyKind::Tracking => "tracking",
            EfficiencyKind::TrackingSmeared => "tracking_smeared",
            EfficiencyKind::Offline => "offline",
            EfficiencyKind::Trigger => "trigger",
            EfficiencyKind::TriggerPreStripping => "trigger_pre_stripping",
            EfficiencyKind::TriggerTisTos => "trigger_tistos",
            EfficiencyKind::OfflineData => "offline_data",
            EfficiencyKind::Pid => "pid",
        }
    }
}

impl fmt::Display for EfficiencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EfficiencyKind {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self> {
        EfficiencyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ExecError::Invalid(format!("efficiency kind '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyEntry {
    pub mode: DecayMode,
    pub polarity: Polarity,
    pub year: Year,
    pub stripping: Stripping,
    pub kind: EfficiencyKind,
    pub result: EfficiencyResult,
}

/// Fitted signal and background of the selected data, within three widths
/// of the signal mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldEntry {
    pub mode: DecayMode,
    pub polarity: Polarity,
    pub year: Year,
    pub signal: EfficiencyResult,
    pub background: EfficiencyResult,
    /// S / sqrt(S + B); zero for an empty window.
    pub significance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchingEntry {
    pub mode: DecayMode,
    pub polarity: Polarity,
    pub year: Year,
    pub total_efficiency: EfficiencyResult,
    /// Signal yield over total efficiency.
    pub production_yield: EfficiencyResult,
    /// Production yield over that of pKpi.
    pub relative: EfficiencyResult,
    /// `relative` times the pKpi branching fraction.
    pub absolute: EfficiencyResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuminosityEntry {
    pub polarity: Polarity,
    pub year: Year,
    pub luminosity: Luminosity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub engine_version: String,

    /// blake3 of the JSON-encoded configuration the run used.
    pub config_hash: Hash256,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,

    pub efficiencies: Vec<EfficiencyEntry>,
    pub luminosities: Vec<LuminosityEntry>,
    #[serde(default)]
    pub yields: Vec<YieldEntry>,
    #[serde(default)]
    pub branching: Vec<BranchingEntry>,
}

/// Branching fraction of Lambda_c -> p K pi, the normalisation of the
/// others.
pub const PKPI_BRANCHING_FRACTION: EfficiencyResult = EfficiencyResult {
    value: 5.0e-2,
    error: 1.3e-2,
};

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Report {
    pub fn new(cfg: &AnalysisConfig) -> Result<Self> {
        cfg.validate()?;
        let config_hash = hash_bytes(&serde_json::to_vec(cfg)?);
        let started_ms = now_ms();
        Ok(Self {
            engine_version: lcyield_core::VERSION.to_string(),
            config_hash,
            started_ms,
            finished_ms: started_ms,
            efficiencies: Vec::new(),
            luminosities: Vec::new(),
            yields: Vec::new(),
            branching: Vec::new(),
        })
    }

    /// Record a result; a later result for the same key and kind replaces
    /// the earlier one.
    pub fn push(&mut self, key: &DatasetKey, kind: EfficiencyKind, result: EfficiencyResult) {
        let entry = EfficiencyEntry {
            mode: key.mode,
            polarity: key.polarity,
            year: key.year,
            stripping: key.stripping,
            kind,
            result,
        };
        match self.efficiencies.iter_mut().find(|e| {
            e.mode == key.mode && e.polarity == key.polarity && e.year == key.year && e.kind == kind
        }) {
            Some(existing) => *existing = entry,
            None => self.efficiencies.push(entry),
        }
    }

    pub fn push_luminosity(&mut self, polarity: Polarity, year: Year, luminosity: Luminosity) {
        self.luminosities.push(LuminosityEntry {
            polarity,
            year,
            luminosity,
        });
    }

    pub fn get(
        &self,
        mode: DecayMode,
        polarity: Polarity,
        year: Year,
        kind: EfficiencyKind,
    ) -> Option<EfficiencyResult> {
        self.efficiencies
            .iter()
            .find(|e| e.mode == mode && e.polarity == polarity && e.year == year && e.kind == kind)
            .map(|e| e.result)
    }

    /// Record the selected yields of `key`, replacing earlier ones.
    pub fn push_yield(
        &mut self,
        key: &DatasetKey,
        signal: EfficiencyResult,
        background: EfficiencyResult,
    ) {
        let entry = YieldEntry {
            mode: key.mode,
            polarity: key.polarity,
            year: key.year,
            signal,
            background,
            significance: significance(signal.value, background.value).unwrap_or(0.0),
        };
        self.yields
            .retain(|y| !(y.mode == key.mode && y.polarity == key.polarity && y.year == key.year));
        self.yields.push(entry);
    }

    pub fn signal_yield(&self, mode: DecayMode, polarity: Polarity, year: Year) -> Option<EfficiencyResult> {
        self.yields
            .iter()
            .find(|y| y.mode == mode && y.polarity == polarity && y.year == year)
            .map(|y| y.signal)
    }

    /// Product of the [`CHAIN`](EfficiencyKind::CHAIN) efficiencies; `None`
    /// unless every factor has been recorded.
    pub fn total(&self, mode: DecayMode, polarity: Polarity, year: Year) -> Option<EfficiencyResult> {
        EfficiencyKind::CHAIN
            .iter()
            .map(|&k| self.get(mode, polarity, year, k))
            .product()
    }

    /// Selected signal yield corrected by the total efficiency.
    pub fn production_yield(
        &self,
        mode: DecayMode,
        polarity: Polarity,
        year: Year,
    ) -> Result<EfficiencyResult> {
        let what = format!("{mode} {polarity} {year}");
        let signal = self
            .signal_yield(mode, polarity, year)
            .ok_or_else(|| ExecError::NotFound(format!("selected yield of {what}")))?;
        let total = self
            .total(mode, polarity, year)
            .ok_or_else(|| ExecError::NotFound(format!("efficiency chain of {what}")))?;
        Ok(yield_ratio(signal, total)?)
    }

    /// Production yield of `mode` over that of pKpi.
    pub fn relative_branching_fraction(
        &self,
        mode: DecayMode,
        polarity: Polarity,
        year: Year,
    ) -> Result<EfficiencyResult> {
        let reference = self.production_yield(DecayMode::PKpi, polarity, year)?;
        Ok(yield_ratio(self.production_yield(mode, polarity, year)?, reference)?)
    }

    /// A [`BranchingEntry`] for every recorded yield.
    pub fn roll_up(&mut self) -> Result<()> {
        let mut branching = Vec::with_capacity(self.yields.len());
        for y in &self.yields {
            let production_yield = self.production_yield(y.mode, y.polarity, y.year)?;
            let relative = self.relative_branching_fraction(y.mode, y.polarity, y.year)?;
            let Some(total_efficiency) = self.total(y.mode, y.polarity, y.year) else {
                continue;
            };
            branching.push(BranchingEntry {
                mode: y.mode,
                polarity: y.polarity,
                year: y.year,
                total_efficiency,
                production_yield,
                relative,
                absolute: relative * PKPI_BRANCHING_FRACTION,
            });
        }
        self.branching = branching;
        Ok(())
    }

    pub fn finish(mut self) -> Self {
        self.finished_ms = now_ms().max(self.started_ms);
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), entries = self.efficiencies.len(), "wrote report");
        Ok(())
    }
}
