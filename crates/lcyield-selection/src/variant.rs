//! Static per-mode selection table.

use std::fmt;

use lcyield_core::keys::DecayMode;
use serde::{Deserialize, Serialize};

/// Lower/upper edges of the Λc mass window, MeV.
pub const MASS_WINDOW: (f64, f64) = (2220.0, 2360.0);

/// Veto window on the ππ invariant mass against K⁰S → ππ, MeV, `[lo, hi)`.
pub const KS_VETO: (f64, f64) = (480.0, 520.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PidScheme {
    #[default]
    ProbNN,
    Dll,
}

/// A one-sided cut on a particle-ID variable, e.g. `ProbNNk > 0.5`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    /// Column suffix after `{track}_`.
    pub var: &'static str,
    pub above: bool,
    pub value: f64,
}

impl Threshold {
    const fn gt(var: &'static str, value: f64) -> Self {
        Self {
            var,
            above: true,
            value,
        }
    }

    const fn lt(var: &'static str, value: f64) -> Self {
        Self {
            var,
            above: false,
            value,
        }
    }

    pub fn passes(&self, x: f64) -> bool {
        if self.above {
            x > self.value
        } else {
            x < self.value
        }
    }
}

/// Offline PID requirements on the two hadrons. The proton requirement is
/// shared by every mode with PID cuts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidCuts {
    pub h1_probnn: Threshold,
    pub h2_probnn: Threshold,
    pub h1_dll: Threshold,
    pub h2_dll: Threshold,
}

impl PidCuts {
    pub fn h1(&self, scheme: PidScheme) -> Threshold {
        match scheme {
            PidScheme::ProbNN => self.h1_probnn,
            PidScheme::Dll => self.h1_dll,
        }
    }

    pub fn h2(&self, scheme: PidScheme) -> Threshold {
        match scheme {
            PidScheme::ProbNN => self.h2_probnn,
            PidScheme::Dll => self.h2_dll,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// Single Gaussian.
    Sgs,
    /// Double Gaussian with a shared mean.
    Dgs,
    /// Gaussian plus Crystal Ball.
    Gcb,
    Exp,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Sgs => "SGS",
            Shape::Dgs => "DGS",
            Shape::Gcb => "GCB",
            Shape::Exp => "EXP",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal and background PDF names handed to the mass fitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitShapes {
    pub signal: Shape,
    pub background: Shape,
}

const fn shapes(signal: Shape, background: Shape) -> FitShapes {
    FitShapes { signal, background }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantSpec {
    pub mode: DecayMode,
    /// Column the mass window is applied to and the fit runs on.
    pub mass_column: &'static str,
    /// Require a converged decay-tree fit (`Lambdab_DTF_CHI2 >= 0`).
    pub requires_dtf: bool,
    /// `h1_h2_M` veto window, `[lo, hi)`.
    pub pair_veto: Option<(f64, f64)>,
    pub pid: Option<PidCuts>,
    pub shapes_preselection: FitShapes,
    pub shapes_postselection: FitShapes,
}

const KK_PID: PidCuts = PidCuts {
    h1_probnn: Threshold::gt("ProbNNk", 0.5),
    h2_probnn: Threshold::gt("ProbNNk", 0.5),
    h1_dll: Threshold::gt("PIDK", 10.0),
    h2_dll: Threshold::gt("PIDK", 10.0),
};

static VARIANTS: [VariantSpec; 6] = [
    VariantSpec {
        mode: DecayMode::PKpi,
        mass_column: "Lambdac_M",
        requires_dtf: false,
        pair_veto: None,
        pid: Some(PidCuts {
            h1_probnn: Threshold::gt("ProbNNk", 0.5),
            h2_probnn: Threshold::gt("ProbNNpi", 0.7),
            h1_dll: Threshold::gt("PIDK", 10.0),
            h2_dll: Threshold::lt("PIDK", 10.0),
        }),
        shapes_preselection: shapes(Shape::Gcb, Shape::Exp),
        shapes_postselection: shapes(Shape::Gcb, Shape::Exp),
    },
    VariantSpec {
        mode: DecayMode::PKK,
        mass_column: "Lambdac_M",
        requires_dtf: false,
        pair_veto: None,
        pid: Some(KK_PID),
        shapes_preselection: shapes(Shape::Sgs, Shape::Exp),
        shapes_postselection: shapes(Shape::Dgs, Shape::Exp),
    },
    VariantSpec {
        mode: DecayMode::Ppipi,
        mass_column: "Lambdac_M",
        requires_dtf: false,
        pair_veto: Some(KS_VETO),
        pid: Some(PidCuts {
            h1_probnn: Threshold::gt("ProbNNpi", 0.7),
            h2_probnn: Threshold::gt("ProbNNpi", 0.7),
            h1_dll: Threshold::lt("PIDK", 0.0),
            h2_dll: Threshold::lt("PIDK", 0.0),
        }),
        shapes_preselection: shapes(Shape::Sgs, Shape::Exp),
        shapes_postselection: shapes(Shape::Dgs, Shape::Exp),
    },
    VariantSpec {
        mode: DecayMode::PKSLL,
        mass_column: "Lambdab_DTF_Lambdac_M",
        requires_dtf: true,
        pair_veto: None,
        pid: None,
        shapes_preselection: shapes(Shape::Dgs, Shape::Exp),
        shapes_postselection: shapes(Shape::Dgs, Shape::Exp),
    },
    VariantSpec {
        mode: DecayMode::PKSDD,
        mass_column: "Lambdab_DTF_Lambdac_M",
        requires_dtf: true,
        pair_veto: None,
        pid: None,
        shapes_preselection: shapes(Shape::Dgs, Shape::Exp),
        shapes_postselection: shapes(Shape::Dgs, Shape::Exp),
    },
    VariantSpec {
        mode: DecayMode::Pphi,
        mass_column: "Lambdac_M",
        requires_dtf: false,
        pair_veto: None,
        pid: Some(KK_PID),
        shapes_preselection: shapes(Shape::Sgs, Shape::Exp),
        shapes_postselection: shapes(Shape::Dgs, Shape::Exp),
    },
];

impl VariantSpec {
    pub fn of(mode: DecayMode) -> &'static VariantSpec {
        let idx = match mode {
            DecayMode::PKpi => 0,
            DecayMode::PKK => 1,
            DecayMode::Ppipi => 2,
            DecayMode::PKSLL => 3,
            DecayMode::PKSDD => 4,
            DecayMode::Pphi => 5,
        };
        &VARIANTS[idx]
    }
}

// Checks shared by every mode.

pub fn in_open_window(x: f64, (lo, hi): (f64, f64)) -> bool {
    lo < x && x < hi
}

/// Momentum and pseudorapidity limits of the PID calibration samples.
pub fn track_in_calibration_range(p: f64, eta: f64) -> bool {
    in_open_window(p, (5e3, 1e5)) && in_open_window(eta, (2.0, 4.5))
}

/// Proton regions without PID calibration data.
pub fn proton_calibration_veto(p: f64, eta: f64) -> bool {
    p > 9.3e3
        && (p > 15.6e3 || eta < 3.875)
        && (p < 29.8e3 || eta > 2.625)
        && (p < 51.4e3 || eta > 3.25)
}

pub fn track_multiplicity_ok(n_tracks: f64) -> bool {
    in_open_window(n_tracks, (0.0, 500.0))
}

pub fn proton_probnn_ok(probnn_p: f64) -> bool {
    probnn_p > 0.5
}

/// DLL proton requirement, against both pions and kaons.
pub fn proton_dll_ok(pid_p: f64, pid_k: f64) -> bool {
    pid_p - pid_k > 9.0 && pid_p > 20.0
}
