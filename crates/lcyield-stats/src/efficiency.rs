use std::fmt;
use std::ops::{Add, Div, Mul};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A value with its standard error.
///
/// Arithmetic propagates errors linearly and treats the operands as
/// uncorrelated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyResult {
    pub value: f64,
    pub error: f64,
}

impl EfficiencyResult {
    pub const fn new(value: f64, error: f64) -> Self {
        Self { value, error }
    }

    /// Exact value, no uncertainty.
    pub const fn exact(value: f64) -> Self {
        Self { value, error: 0.0 }
    }

    pub fn relative_error(&self) -> f64 {
        if self.value == 0.0 {
            0.0
        } else {
            (self.error / self.value).abs()
        }
    }
}

impl fmt::Display for EfficiencyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5} +/- {:.5}", self.value, self.error)
    }
}

impl Mul for EfficiencyResult {
    type Output = EfficiencyResult;

    fn mul(self, rhs: EfficiencyResult) -> EfficiencyResult {
        let a = rhs.value * self.error;
        let b = self.value * rhs.error;
        EfficiencyResult::new(self.value * rhs.value, a.hypot(b))
    }
}

impl Mul<f64> for EfficiencyResult {
    type Output = EfficiencyResult;

    fn mul(self, rhs: f64) -> EfficiencyResult {
        EfficiencyResult::new(self.value * rhs, self.error * rhs.abs())
    }
}

impl Add for EfficiencyResult {
    type Output = EfficiencyResult;

    fn add(self, rhs: EfficiencyResult) -> EfficiencyResult {
        EfficiencyResult::new(self.value + rhs.value, self.error.hypot(rhs.error))
    }
}

impl Div<f64> for EfficiencyResult {
    type Output = EfficiencyResult;

    fn div(self, rhs: f64) -> EfficiencyResult {
        EfficiencyResult::new(self.value / rhs, self.error / rhs.abs())
    }
}

impl std::iter::Product for EfficiencyResult {
    fn product<I: Iterator<Item = EfficiencyResult>>(iter: I) -> Self {
        iter.fold(EfficiencyResult::exact(1.0), |acc, e| acc * e)
    }
}

/// `pass / total` with the binomial error `sqrt(pass * (total - pass) / total^3)`.
pub fn efficiency_from_counts(pass: u64, total: u64) -> Result<EfficiencyResult> {
    if total == 0 {
        return Err(Error::Division(format!(
            "efficiency of {pass} passing out of zero"
        )));
    }
    if pass > total {
        return Err(Error::InvalidArgument(format!(
            "{pass} passing exceeds {total} total"
        )));
    }
    let k = pass as f64;
    let n = total as f64;
    let error = (k * (n - k) / (n * n * n)).sqrt();
    Ok(EfficiencyResult::new(k / n, error))
}

/// `after / before` for two independently fitted yields; relative errors
/// add in quadrature.
pub fn yield_ratio(after: EfficiencyResult, before: EfficiencyResult) -> Result<EfficiencyResult> {
    if before.value == 0.0 {
        return Err(Error::Division(format!("yield {after} over a zero yield")));
    }
    let value = after.value / before.value;
    let a = after.error / before.value;
    let b = value * before.error / before.value;
    Ok(EfficiencyResult::new(value, a.hypot(b).abs()))
}

/// `S / sqrt(S + B)`.
pub fn significance(signal: f64, background: f64) -> Result<f64> {
    let total = signal + background;
    if total <= 0.0 {
        return Err(Error::Division(format!(
            "significance of {signal} signal over {background} background"
        )));
    }
    Ok(signal / total.sqrt())
}

/// Mean of the two magnet polarities; the errors combine in quadrature and
/// halve.
pub fn aggregate_by_polarity(up: EfficiencyResult, down: EfficiencyResult) -> EfficiencyResult {
    (up + down) / 2.0
}
