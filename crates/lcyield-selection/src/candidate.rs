use lcyield_core::keys::DecayMode;
use lcyield_store::{ColumnRef, EventStore};
use tracing::{debug, warn};

use crate::columns::{required_columns, Decision, TriggerNaming, TRUTH_COLUMNS};
use crate::error::Result;
use crate::variant::{
    in_open_window, proton_calibration_veto, proton_dll_ok, proton_probnn_ok,
    track_in_calibration_range, track_multiplicity_ok, PidScheme, Threshold, VariantSpec,
    MASS_WINDOW,
};
use crate::SelectionConfig;

struct TrackCells {
    p: ColumnRef,
    eta: ColumnRef,
}

impl TrackCells {
    fn bind(store: &EventStore, track: &str) -> Result<Self> {
        Ok(Self {
            p: store.value_ref(&format!("{track}_P"))?,
            eta: store.value_ref(&format!("{track}_ETA"))?,
        })
    }

    fn in_calibration_range(&self) -> bool {
        track_in_calibration_range(self.p.f64(), self.eta.f64())
    }
}

enum ProtonPid {
    ProbNN(ColumnRef),
    Dll { pid_p: ColumnRef, pid_k: ColumnRef },
}

impl ProtonPid {
    fn bind(store: &EventStore, scheme: PidScheme) -> Result<Self> {
        Ok(match scheme {
            PidScheme::ProbNN => ProtonPid::ProbNN(store.value_ref("proton_ProbNNp")?),
            PidScheme::Dll => ProtonPid::Dll {
                pid_p: store.value_ref("proton_PIDp")?,
                pid_k: store.value_ref("proton_PIDK")?,
            },
        })
    }

    fn passes(&self) -> bool {
        match self {
            ProtonPid::ProbNN(p) => proton_probnn_ok(p.f64()),
            ProtonPid::Dll { pid_p, pid_k } => proton_dll_ok(pid_p.f64(), pid_k.f64()),
        }
    }
}

struct PidCells {
    proton: ProtonPid,
    h1: ColumnRef,
    h1_cut: Threshold,
    h2: ColumnRef,
    h2_cut: Threshold,
}

/// The L0, HLT1 and HLT2 decisions of one kind (TOS or TIS) for the current
/// row.
pub struct TriggerLines {
    l0: ColumnRef,
    hlt1: ColumnRef,
    hlt2: [ColumnRef; 3],
}

impl TriggerLines {
    /// Bind to line columns that are already active in `store`.
    pub fn bind(store: &EventStore, naming: TriggerNaming, decision: Decision) -> Result<Self> {
        let [l0, hlt1, t2, t3, t4] = naming.lines(decision);
        Ok(Self {
            l0: store.value_ref(&l0)?,
            hlt1: store.value_ref(&hlt1)?,
            hlt2: [
                store.value_ref(&t2)?,
                store.value_ref(&t3)?,
                store.value_ref(&t4)?,
            ],
        })
    }

    pub fn activate_and_bind(
        store: &mut EventStore,
        naming: TriggerNaming,
        decision: Decision,
    ) -> Result<Self> {
        store.activate_columns(naming.lines(decision), true)?;
        Self::bind(store, naming, decision)
    }

    /// L0 and HLT1 and any of the HLT2 lines.
    pub fn passes(&self) -> bool {
        self.l0.bool() && self.hlt1.bool() && self.hlt2.iter().any(|c| c.bool())
    }
}

/// One decay-mode reading of the current store row.
pub struct Candidate {
    spec: &'static VariantSpec,
    mass: ColumnRef,
    proton: TrackCells,
    h1: TrackCells,
    h2: TrackCells,
    n_tracks: ColumnRef,
    dtf_chi2: Option<ColumnRef>,
    pair_mass: Option<ColumnRef>,
    tos: TriggerLines,
    pid: Option<PidCells>,
    truth: Option<[ColumnRef; 2]>,
}

impl Candidate {
    /// Bind to columns that are already active in `store`.
    pub fn bind(store: &EventStore, mode: DecayMode, cfg: &SelectionConfig) -> Result<Self> {
        let spec = VariantSpec::of(mode);

        let pid = match spec.pid {
            Some(cuts) => {
                let h1_cut = cuts.h1(cfg.pid);
                let h2_cut = cuts.h2(cfg.pid);
                Some(PidCells {
                    proton: ProtonPid::bind(store, cfg.pid)?,
                    h1: store.value_ref(&format!("h1_{}", h1_cut.var))?,
                    h1_cut,
                    h2: store.value_ref(&format!("h2_{}", h2_cut.var))?,
                    h2_cut,
                })
            }
            None => None,
        };

        let pair_mass = match spec.pair_veto {
            Some(_) => match store.value_ref("h1_h2_M") {
                Ok(cell) => Some(cell),
                // the meta builder binds without meta before the pair mass exists
                Err(e) if !cfg.with_meta => {
                    debug!(store = store.name(), mode = %mode, error = %e,
                        "no h1_h2_M bound; the offline veto fails every candidate");
                    None
                }
                Err(e) => {
                    warn!(store = store.name(), mode = %mode, error = %e,
                        "h1_h2_M unavailable; every candidate will fail the offline veto");
                    None
                }
            },
            None => None,
        };

        let truth = if cfg.mc {
            Some([
                store.value_ref(TRUTH_COLUMNS[0])?,
                store.value_ref(TRUTH_COLUMNS[1])?,
            ])
        } else {
            None
        };

        Ok(Self {
            spec,
            mass: store.value_ref(spec.mass_column)?,
            proton: TrackCells::bind(store, "proton")?,
            h1: TrackCells::bind(store, "h1")?,
            h2: TrackCells::bind(store, "h2")?,
            n_tracks: store.value_ref("nTracks")?,
            dtf_chi2: if spec.requires_dtf {
                Some(store.value_ref("Lambdab_DTF_CHI2")?)
            } else {
                None
            },
            pair_mass,
            tos: TriggerLines::bind(store, cfg.trigger_naming, Decision::Tos)?,
            pid,
            truth,
        })
    }

    /// Activate the mode's required columns (keeping the current set) and bind.
    pub fn activate_and_bind(
        store: &mut EventStore,
        mode: DecayMode,
        cfg: &SelectionConfig,
    ) -> Result<Self> {
        store.activate_columns(required_columns(mode, cfg), true)?;
        Self::bind(store, mode, cfg)
    }

    pub fn mode(&self) -> DecayMode {
        self.spec.mode
    }

    pub fn spec(&self) -> &'static VariantSpec {
        self.spec
    }

    /// Current value of the mode's mass column.
    pub fn mass(&self) -> f64 {
        self.mass.f64()
    }

    /// TOS on L0, HLT1 and HLT2.
    pub fn passes_trigger(&self) -> bool {
        self.tos.passes()
    }

    pub fn passes_preselection(&self) -> bool {
        let base = in_open_window(self.mass.f64(), MASS_WINDOW)
            && self.proton.in_calibration_range()
            && track_multiplicity_ok(self.n_tracks.f64())
            && proton_calibration_veto(self.proton.p.f64(), self.proton.eta.f64());
        base && self.passes_specific_preselection()
    }

    fn passes_specific_preselection(&self) -> bool {
        let dtf_ok = self
            .dtf_chi2
            .as_ref()
            .map(|c| c.f64() >= 0.0)
            .unwrap_or(true);
        self.h1.in_calibration_range() && self.h2.in_calibration_range() && dtf_ok
    }

    pub fn passes_offline(&self) -> bool {
        self.passes_preselection() && self.passes_specific_offline()
    }

    fn passes_specific_offline(&self) -> bool {
        match (self.spec.pair_veto, &self.pair_mass) {
            (None, _) => true,
            (Some((lo, hi)), Some(m)) => {
                let m = m.f64();
                !(lo <= m && m < hi)
            }
            (Some(_), None) => false,
        }
    }

    pub fn passes_pid(&self) -> bool {
        let Some(pid) = &self.pid else {
            return true;
        };
        pid.proton.passes() && pid.h1_cut.passes(pid.h1.f64()) && pid.h2_cut.passes(pid.h2.f64())
    }

    /// Trigger, preselection, offline and PID, stopping at the first failure.
    pub fn passes_selection(&self) -> bool {
        self.passes_trigger() && self.passes_offline() && self.passes_pid()
    }

    /// False when the candidate was bound without truth columns.
    pub fn is_truth_matched(&self) -> bool {
        match &self.truth {
            Some([lb, lc]) => lb.f64() < 60.0 && lc.f64() < 20.0,
            None => false,
        }
    }
}
