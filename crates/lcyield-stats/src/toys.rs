//! Propagating a reference table's bin errors by smearing.
//!
//! Toy `i` of a run uses seed `i`, starting at 1; a seed of 0 draws from
//! system entropy and is not reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, info};

use crate::efficiency::EfficiencyResult;
use crate::error::{Error, Result};
use crate::hist2d::{ReferenceTable, Spectrum};
use crate::reweight::total_efficiency;

/// Deterministic generator for a nonzero seed, entropy-seeded for 0.
pub fn seeded_rng(seed: u64) -> StdRng {
    if seed == 0 {
        StdRng::from_entropy()
    } else {
        StdRng::seed_from_u64(seed)
    }
}

/// Copy of `table` with every bin value replaced by one draw from
/// `Normal(value, error)`.
pub fn run_toy(seed: u64, table: &ReferenceTable) -> Result<ReferenceTable> {
    let mut rng = seeded_rng(seed);
    let mut smeared = Vec::with_capacity(table.values().len());
    for (k, (&mean, &sigma)) in table.values().iter().zip(table.errors()).enumerate() {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "bin {k} has error {sigma}"
            )));
        }
        let normal = Normal::new(mean, sigma)
            .map_err(|e| Error::InvalidArgument(format!("bin {k}: {e}")))?;
        smeared.push(normal.sample(&mut rng));
    }
    Ok(table.with_values(smeared))
}

/// Mean and population standard deviation, over `n` smeared tables, of the
/// product of each spectrum's efficiency.
pub fn run_n_toys(n: u64, spectra: &[Spectrum], table: &ReferenceTable) -> Result<EfficiencyResult> {
    if n == 0 {
        return Err(Error::InvalidArgument("at least one toy is required".into()));
    }
    info!(toys = n, spectra = spectra.len(), "running smearing toys");
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for seed in 1..=n {
        let smeared = run_toy(seed, table)?;
        let mut eff = 1.0;
        for spectrum in spectra {
            eff *= total_efficiency(spectrum, &smeared)?.value;
        }
        debug!(seed, eff, "toy");
        sum += eff;
        sum_sq += eff * eff;
    }
    let n = n as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    Ok(EfficiencyResult::new(mean, variance.sqrt()))
}
