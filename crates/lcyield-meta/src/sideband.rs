//! Counting fit: a flat background estimated from the sidebands of a fixed
//! signal window. Used when no external fit result is supplied.

use lcyield_selection::variant::MASS_WINDOW;
use lcyield_selection::FitShapes;
use lcyield_stats::EfficiencyResult;
use tracing::debug;

use crate::error::{Error, Result};
use crate::fit::{Component, FittedModel, MassFitter, SWeightRow, FULL_COVARIANCE};

/// Lambda_c mass +/- three times its resolution, MeV.
pub const SIGNAL_WINDOW: (f64, f64) = (2268.0, 2304.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidebandFitter {
    signal: (f64, f64),
    range: (f64, f64),
}

impl Default for SidebandFitter {
    fn default() -> Self {
        Self {
            signal: SIGNAL_WINDOW,
            range: MASS_WINDOW,
        }
    }
}

impl SidebandFitter {
    /// `signal` must lie strictly inside `range` and leave a sideband.
    pub fn new(signal: (f64, f64), range: (f64, f64)) -> Result<Self> {
        let ordered = signal.0 < signal.1 && range.0 < range.1;
        let inside = range.0 <= signal.0 && signal.1 <= range.1;
        if !ordered || !inside || width(signal) >= width(range) {
            return Err(Error::Fit(format!(
                "signal window {signal:?} does not leave a sideband in {range:?}"
            )));
        }
        Ok(Self { signal, range })
    }
}

impl MassFitter for SidebandFitter {
    fn fit(&self, masses: &[f64], _shapes: FitShapes) -> Result<Box<dyn FittedModel>> {
        let model = SidebandModel::new(*self, masses.to_vec());
        debug!(
            rows = masses.len(),
            in_window = model.in_window,
            sideband = model.sideband,
            "sideband fit"
        );
        Ok(Box::new(model))
    }
}

fn width((lo, hi): (f64, f64)) -> f64 {
    hi - lo
}

fn overlap(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.1.min(b.1) - a.0.max(b.0)).max(0.0)
}

fn contains((lo, hi): (f64, f64), m: f64) -> bool {
    lo <= m && m <= hi
}

/// Signal is the window count less the scaled sideband count; the
/// background is flat over the whole range.
#[derive(Debug, Clone)]
pub struct SidebandModel {
    fitter: SidebandFitter,
    masses: Vec<f64>,
    in_window: u64,
    sideband: u64,
}

impl SidebandModel {
    fn new(fitter: SidebandFitter, masses: Vec<f64>) -> Self {
        let (mut in_window, mut sideband) = (0, 0);
        for &m in &masses {
            if contains(fitter.signal, m) {
                in_window += 1;
            } else if contains(fitter.range, m) {
                sideband += 1;
            }
        }
        Self {
            fitter,
            masses,
            in_window,
            sideband,
        }
    }

    /// Background under the window per sideband candidate.
    fn window_scale(&self) -> f64 {
        width(self.fitter.signal) / (width(self.fitter.range) - width(self.fitter.signal))
    }

    /// Background over the full range per sideband candidate.
    fn range_scale(&self) -> f64 {
        width(self.fitter.range) / (width(self.fitter.range) - width(self.fitter.signal))
    }
}

impl FittedModel for SidebandModel {
    fn n_rows(&self) -> usize {
        self.masses.len()
    }

    fn weights_for(&self, row: usize) -> Option<SWeightRow> {
        let mass = *self.masses.get(row)?;
        let (signal, background) = if contains(self.fitter.signal, mass) {
            (1.0, 0.0)
        } else if contains(self.fitter.range, mass) {
            (-self.window_scale(), self.range_scale())
        } else {
            (0.0, 0.0)
        };
        Some(SWeightRow {
            mass,
            signal,
            background,
        })
    }

    fn integral_in_range(&self, component: Component, range: (f64, f64)) -> f64 {
        let shape = match component {
            Component::Signal => self.fitter.signal,
            Component::Background => self.fitter.range,
        };
        overlap(shape, range) / width(shape)
    }

    fn yields(&self) -> (EfficiencyResult, EfficiencyResult) {
        let (n_sig, n_side) = (self.in_window as f64, self.sideband as f64);
        let r = self.window_scale();
        let signal = EfficiencyResult::new(n_sig - r * n_side, (n_sig + r * r * n_side).sqrt());
        let scale = self.range_scale();
        let background = EfficiencyResult::new(scale * n_side, scale * n_side.sqrt());
        (signal, background)
    }

    /// Window centre and a sixth of its width.
    fn signal_window(&self) -> (f64, f64) {
        let (lo, hi) = self.fitter.signal;
        ((lo + hi) / 2.0, (hi - lo) / 6.0)
    }

    fn covariance_quality(&self) -> i32 {
        FULL_COVARIANCE
    }
}

#[cfg(test)]
mod tests {
    use lcyield_selection::Shape;

    use super::*;
    use crate::fit::signal_region_yields;

    fn shapes() -> FitShapes {
        FitShapes {
            signal: Shape::Gcb,
            background: Shape::Exp,
        }
    }

    fn fitter() -> SidebandFitter {
        // 20 MeV window, 80 MeV of sideband
        SidebandFitter::new((2280.0, 2300.0), (2240.0, 2340.0)).unwrap()
    }

    #[test]
    fn window_must_leave_a_sideband() {
        assert!(SidebandFitter::new((2240.0, 2340.0), (2240.0, 2340.0)).is_err());
        assert!(SidebandFitter::new((2300.0, 2280.0), (2240.0, 2340.0)).is_err());
        assert!(SidebandFitter::new((2200.0, 2300.0), (2240.0, 2340.0)).is_err());
        let default = SidebandFitter::default();
        assert_eq!(default, SidebandFitter::new(SIGNAL_WINDOW, MASS_WINDOW).unwrap());
    }

    #[test]
    fn signal_is_window_less_scaled_sideband() {
        let mut masses = vec![2290.0; 12];
        masses.extend([2250.0, 2260.0, 2320.0, 2330.0]);
        masses.push(2400.0);
        let model = fitter().fit(&masses, shapes()).unwrap();
        assert_eq!(model.n_rows(), 17);

        let (sig, bkg) = model.yields();
        assert!((sig.value - 11.0).abs() < 1e-12);
        assert!((sig.error - (12.0f64 + 0.0625 * 4.0).sqrt()).abs() < 1e-12);
        assert!((bkg.value - 5.0).abs() < 1e-12);

        let y = signal_region_yields(model.as_ref());
        assert!((y.range.0 - 2280.0).abs() < 1e-9 && (y.range.1 - 2300.0).abs() < 1e-9);
        assert!((y.signal.value - 11.0).abs() < 1e-12);
        assert!((y.background.value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weights_sum_to_the_yields() {
        let masses = [2290.0, 2285.0, 2250.0, 2330.0, 2100.0];
        let model = fitter().fit(&masses, shapes()).unwrap();
        let rows: Vec<SWeightRow> = (0..masses.len())
            .map(|i| model.weights_for(i).unwrap())
            .collect();
        assert_eq!(rows[0].signal, 1.0);
        assert_eq!(rows[2].signal, -0.25);
        assert_eq!(rows[2].sum(), 1.0);
        assert_eq!(rows[4].sum(), 0.0);
        assert_eq!(rows[3].mass, 2330.0);
        assert!(model.weights_for(5).is_none());

        let (sig, bkg) = model.yields();
        let sum_sig: f64 = rows.iter().map(|r| r.signal).sum();
        let sum_bkg: f64 = rows.iter().map(|r| r.background).sum();
        assert!((sum_sig - sig.value).abs() < 1e-12);
        assert!((sum_bkg - bkg.value).abs() < 1e-12);
    }

    #[test]
    fn empty_sample_has_no_yield() {
        let model = SidebandFitter::default().fit(&[], shapes()).unwrap();
        let (sig, bkg) = model.yields();
        assert_eq!(sig.value, 0.0);
        assert_eq!(bkg.value, 0.0);
        assert_eq!(model.signal_window(), (2286.0, 6.0));
    }
}
