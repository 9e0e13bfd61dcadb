//! Efficiencies measured outside this workspace.
//!
//! PID efficiencies come from the calibration-sample reweighting of the
//! truth-matched simulation; acceptances from the generator statistics. Both
//! are known for 2011 only. The combined polarity is the polarity average.

use lcyield_core::keys::{DecayMode, Polarity, Stripping, Year};

use crate::efficiency::{aggregate_by_polarity, EfficiencyResult};
use crate::error::{Error, Result};

type PolarityPair = (EfficiencyResult, EfficiencyResult);

const fn pair(up: (f64, f64), down: (f64, f64)) -> PolarityPair {
    (
        EfficiencyResult::new(up.0, up.1),
        EfficiencyResult::new(down.0, down.1),
    )
}

fn pid_2011(mode: DecayMode, stripping: Stripping) -> Option<PolarityPair> {
    use DecayMode::*;
    let p = match (stripping, mode) {
        (Stripping::S17b, PKpi) => pair((0.38016, 0.00006), (0.38131, 0.00008)),
        (Stripping::S17b, PKK) => pair((0.35378, 0.00012), (0.35893, 0.00017)),
        (Stripping::S17b, Ppipi) => pair((0.39228, 0.00014), (0.39182, 0.00015)),
        (Stripping::S17b, Pphi) => pair((0.35814, 0.00020), (0.36267, 0.00023)),
        (Stripping::S20r1, PKpi) => pair((0.40271, 0.00013), (0.40824, 0.00011)),
        (Stripping::S20r1, PKK) => pair((0.35087, 0.00007), (0.35466, 0.00006)),
        (Stripping::S20r1, Ppipi) => pair((0.46807, 0.00010), (0.47014, 0.00009)),
        (Stripping::S20r1, Pphi) => pair((0.34985, 0.00012), (0.35816, 0.00010)),
        _ => return None,
    };
    Some(p)
}

fn acceptance_2011(mode: DecayMode) -> Option<PolarityPair> {
    match mode {
        DecayMode::PKpi => Some(pair((0.3347, 0.000779), (0.3347, 0.000776))),
        DecayMode::PKK => Some(pair((0.1946, 0.000498), (0.1930, 0.000495))),
        DecayMode::Ppipi => Some(pair((0.1691, 0.000439), (0.1691, 0.000440))),
        _ => None,
    }
}

fn select(pair: PolarityPair, polarity: Polarity) -> EfficiencyResult {
    match polarity {
        Polarity::MagUp => pair.0,
        Polarity::MagDown => pair.1,
        Polarity::Combined => aggregate_by_polarity(pair.0, pair.1),
    }
}

/// Offline PID efficiency. KS modes carry no PID requirement and have none.
pub fn pid_efficiency(
    mode: DecayMode,
    polarity: Polarity,
    year: Year,
    stripping: Stripping,
) -> Result<EfficiencyResult> {
    let found = match year {
        Year::Y2011 => pid_2011(mode, stripping),
        Year::Y2012 => None,
    };
    found.map(|p| select(p, polarity)).ok_or_else(|| {
        Error::NotFound(format!(
            "PID efficiency for {mode} {year} {stripping} {polarity}"
        ))
    })
}

/// Generator-level acceptance.
pub fn acceptance_efficiency(
    mode: DecayMode,
    polarity: Polarity,
    year: Year,
) -> Result<EfficiencyResult> {
    let found = match year {
        Year::Y2011 => acceptance_2011(mode),
        Year::Y2012 => None,
    };
    found
        .map(|p| select(p, polarity))
        .ok_or_else(|| Error::NotFound(format!("acceptance for {mode} {year} {polarity}")))
}
