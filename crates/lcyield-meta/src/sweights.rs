//! sWeights computed by an external fitting tool, read from CSV.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use lcyield_selection::FitShapes;
use lcyield_stats::EfficiencyResult;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::fit::{Component, FittedModel, MassFitter, SWeightRow, FULL_COVARIANCE};

#[derive(Debug, Deserialize)]
struct CsvRow {
    mass: f64,
    signal_sw: f64,
    background_sw: f64,
}

/// Rows of `mass,signal_sw,background_sw`, one per fitted candidate in the
/// order the candidates were selected.
///
/// Acts as both the fitter and its result: "fitting" checks that the file
/// covers exactly the selected rows, and the model's shape integrals and
/// yields are the sWeighted sums.
#[derive(Debug, Clone, PartialEq)]
pub struct SWeightFile {
    rows: Vec<SWeightRow>,
}

impl SWeightFile {
    pub fn new(rows: Vec<SWeightRow>) -> Self {
        Self { rows }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        for rec in rdr.deserialize() {
            let r: CsvRow = rec?;
            rows.push(SWeightRow {
                mass: r.mass,
                signal: r.signal_sw,
                background: r.background_sw,
            });
        }
        Ok(Self { rows })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::NotFound(format!("{}: {e}", path.display())))?;
        let sw = Self::from_reader(file)?;
        info!(path = %path.display(), rows = sw.rows.len(), "loaded sWeights");
        Ok(sw)
    }

    pub fn rows(&self) -> &[SWeightRow] {
        &self.rows
    }

    fn weight(row: &SWeightRow, component: Component) -> f64 {
        match component {
            Component::Signal => row.signal,
            Component::Background => row.background,
        }
    }

    fn sum_of(&self, component: Component) -> EfficiencyResult {
        let (sum, sum_sq) = self.rows.iter().fold((0.0, 0.0), |(s, s2), r| {
            let w = Self::weight(r, component);
            (s + w, s2 + w * w)
        });
        EfficiencyResult::new(sum, sum_sq.sqrt())
    }
}

impl MassFitter for SWeightFile {
    fn fit(&self, masses: &[f64], _shapes: FitShapes) -> Result<Box<dyn FittedModel>> {
        if masses.len() != self.rows.len() {
            return Err(Error::Mismatch(format!(
                "{} sWeight rows for {} selected candidates",
                self.rows.len(),
                masses.len()
            )));
        }
        Ok(Box::new(self.clone()))
    }
}

impl FittedModel for SWeightFile {
    fn n_rows(&self) -> usize {
        self.rows.len()
    }

    fn weights_for(&self, row: usize) -> Option<SWeightRow> {
        self.rows.get(row).copied()
    }

    fn integral_in_range(&self, component: Component, (lo, hi): (f64, f64)) -> f64 {
        let total = self.sum_of(component).value;
        if total == 0.0 {
            return 0.0;
        }
        let inside: f64 = self
            .rows
            .iter()
            .filter(|r| lo <= r.mass && r.mass <= hi)
            .map(|r| Self::weight(r, component))
            .sum();
        inside / total
    }

    fn yields(&self) -> (EfficiencyResult, EfficiencyResult) {
        (
            self.sum_of(Component::Signal),
            self.sum_of(Component::Background),
        )
    }

    /// sWeighted mean and standard deviation of the signal mass.
    fn signal_window(&self) -> (f64, f64) {
        let (w, wm, wm2) = self.rows.iter().fold((0.0, 0.0, 0.0), |(w, wm, wm2), r| {
            (w + r.signal, wm + r.signal * r.mass, wm2 + r.signal * r.mass * r.mass)
        });
        if w <= 0.0 {
            return (0.0, 0.0);
        }
        let mean = wm / w;
        (mean, (wm2 / w - mean * mean).max(0.0).sqrt())
    }

    fn covariance_quality(&self) -> i32 {
        FULL_COVARIANCE
    }
}
