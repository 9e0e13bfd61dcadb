//! Boundary to the mass fit. The fit model itself lives outside this
//! workspace; these traits are what the meta builder and the yield
//! extraction need from it.

use lcyield_selection::FitShapes;
use lcyield_stats::EfficiencyResult;
use serde::Serialize;
use tracing::warn;

use crate::error::Result;

/// Covariance quality of a fully accurate fit.
pub const FULL_COVARIANCE: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Signal,
    Background,
}

/// Per-row sWeights of the fitted sample, with the mass the row was fitted at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SWeightRow {
    pub mass: f64,
    pub signal: f64,
    pub background: f64,
}

impl SWeightRow {
    pub fn sum(&self) -> f64 {
        self.signal + self.background
    }
}

pub trait MassFitter {
    /// Fit the masses, in row order, with the given shapes.
    fn fit(&self, masses: &[f64], shapes: FitShapes) -> Result<Box<dyn FittedModel>>;
}

pub trait FittedModel {
    /// Rows of the fitted sample.
    fn n_rows(&self) -> usize;

    fn weights_for(&self, row: usize) -> Option<SWeightRow>;

    /// Fraction of the component's normalised shape inside `range`.
    fn integral_in_range(&self, component: Component, range: (f64, f64)) -> f64;

    /// Fitted (signal, background) yields.
    fn yields(&self) -> (EfficiencyResult, EfficiencyResult);

    /// Signal mean and width.
    fn signal_window(&self) -> (f64, f64);

    /// 0 (not calculated) to 3 (full, accurate).
    fn covariance_quality(&self) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalRegionYields {
    pub range: (f64, f64),
    pub signal: EfficiencyResult,
    pub background: EfficiencyResult,
}

/// Yields within three signal widths of the signal mean.
pub fn signal_region_yields(model: &dyn FittedModel) -> SignalRegionYields {
    check_quality(model);
    let (mean, sigma) = model.signal_window();
    let range = (mean - 3.0 * sigma, mean + 3.0 * sigma);
    let (signal, background) = model.yields();
    SignalRegionYields {
        range,
        signal: signal * model.integral_in_range(Component::Signal, range),
        background: background * model.integral_in_range(Component::Background, range),
    }
}

/// Logs a poor covariance; the fit result is still used.
pub fn check_quality(model: &dyn FittedModel) -> bool {
    let quality = model.covariance_quality();
    if quality < FULL_COVARIANCE {
        warn!(quality, "mass fit covariance matrix is not fully accurate");
        false
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        quality: i32,
    }

    impl FittedModel for Fixed {
        fn n_rows(&self) -> usize {
            0
        }

        fn weights_for(&self, _row: usize) -> Option<SWeightRow> {
            None
        }

        fn integral_in_range(&self, component: Component, range: (f64, f64)) -> f64 {
            assert_eq!(range, (2270.0, 2300.0));
            match component {
                Component::Signal => 0.99,
                Component::Background => 0.25,
            }
        }

        fn yields(&self) -> (EfficiencyResult, EfficiencyResult) {
            (EfficiencyResult::new(1000.0, 40.0), EfficiencyResult::new(400.0, 20.0))
        }

        fn signal_window(&self) -> (f64, f64) {
            (2285.0, 5.0)
        }

        fn covariance_quality(&self) -> i32 {
            self.quality
        }
    }

    #[test]
    fn yields_scale_by_window_fraction() {
        let y = signal_region_yields(&Fixed { quality: 3 });
        assert_eq!(y.range, (2270.0, 2300.0));
        assert!((y.signal.value - 990.0).abs() < 1e-9);
        assert!((y.signal.error - 39.6).abs() < 1e-9);
        assert!((y.background.value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn poor_covariance_is_not_fatal() {
        assert!(!check_quality(&Fixed { quality: 1 }));
        assert!(check_quality(&Fixed { quality: 3 }));
        let y = signal_region_yields(&Fixed { quality: 2 });
        assert!(y.signal.value > 0.0);
    }
}
