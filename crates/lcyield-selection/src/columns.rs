//! Column naming and the per-mode column sets to activate.

use lcyield_core::keys::DecayMode;

use crate::variant::{PidScheme, VariantSpec};
use crate::SelectionConfig;

/// MC truth matching on the background categories.
pub const TRUTH_MATCH_CUT: &str = "Lambdab_BKGCAT < 60 && Lambdac_BKGCAT < 20";

pub const TRUTH_COLUMNS: [&str; 2] = ["Lambdab_BKGCAT", "Lambdac_BKGCAT"];

/// Columns of the derived `MetaTree` friend read by the selection.
pub const META_COLUMNS: [&str; 7] = [
    "signal_sw",
    "background_sw",
    "accepted",
    "triggered",
    "h1_h2_M",
    "p_h1_M",
    "p_h2_M",
];

pub const TRACKS: [&str; 3] = ["proton", "h1", "h2"];

/// Whether the trigger fired on the candidate (TOS) or independently of it
/// (TIS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Tos,
    Tis,
}

impl Decision {
    fn suffix(&self) -> &'static str {
        match self {
            Decision::Tos => "TOS",
            Decision::Tis => "TIS",
        }
    }
}

/// Trigger decision column naming. The 17b ntuples store the same lines
/// without the `Decision` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerNaming {
    #[default]
    Standard,
    Legacy,
}

impl TriggerNaming {
    fn line(&self, particle: &str, line: &str, decision: Decision) -> String {
        let suffix = decision.suffix();
        match self {
            TriggerNaming::Standard => format!("{particle}_{line}Decision_{suffix}"),
            TriggerNaming::Legacy => format!("{particle}_{line}_{suffix}"),
        }
    }

    /// L0, HLT1 and the three HLT2 topological lines, in that order.
    pub fn lines(&self, decision: Decision) -> [String; 5] {
        let [t2, t3, t4] =
            [2, 3, 4].map(|n| self.line("Lambdab", &format!("Hlt2TopoMu{n}BodyBBDT"), decision));
        [
            self.line("mu", "L0Muon", decision),
            self.line("mu", "Hlt1TrackMuon", decision),
            t2,
            t3,
            t4,
        ]
    }

    pub fn l0(&self) -> String {
        self.line("mu", "L0Muon", Decision::Tos)
    }

    pub fn hlt1(&self) -> String {
        self.line("mu", "Hlt1TrackMuon", Decision::Tos)
    }

    pub fn hlt2(&self) -> [String; 3] {
        let [_, _, t2, t3, t4] = self.lines(Decision::Tos);
        [t2, t3, t4]
    }

    /// Every TOS line.
    pub fn all(&self) -> Vec<String> {
        self.lines(Decision::Tos).into()
    }
}

/// Proton columns read by the proton PID requirement of `scheme`.
pub fn proton_pid_columns(scheme: PidScheme) -> &'static [&'static str] {
    match scheme {
        PidScheme::ProbNN => &["proton_ProbNNp"],
        PidScheme::Dll => &["proton_PIDp", "proton_PIDK"],
    }
}

/// Every column the selection of `mode` reads: track kinematics, the PID
/// variables of the configured scheme, the TOS trigger lines, the truth
/// columns for MC and the meta columns when requested.
pub fn required_columns(mode: DecayMode, cfg: &SelectionConfig) -> Vec<String> {
    let spec = VariantSpec::of(mode);
    let mut out: Vec<String> = vec!["Lambdac_M".into()];
    if spec.mass_column != "Lambdac_M" {
        out.push(spec.mass_column.into());
    }
    if spec.requires_dtf {
        out.push("Lambdab_DTF_CHI2".into());
    }
    for track in TRACKS {
        out.push(format!("{track}_P"));
        out.push(format!("{track}_ETA"));
    }
    if let Some(cuts) = spec.pid {
        out.extend(proton_pid_columns(cfg.pid).iter().map(|c| c.to_string()));
        out.push(format!("h1_{}", cuts.h1(cfg.pid).var));
        out.push(format!("h2_{}", cuts.h2(cfg.pid).var));
    }
    out.extend(cfg.trigger_naming.all());
    out.push("nTracks".into());
    if cfg.mc {
        out.extend(TRUTH_COLUMNS.iter().map(|c| c.to_string()));
    }
    if cfg.with_meta {
        out.extend(META_COLUMNS.iter().map(|c| c.to_string()));
    }
    out
}
