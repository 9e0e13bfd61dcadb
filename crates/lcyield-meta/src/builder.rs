use std::path::{Path, PathBuf};

use lcyield_core::keys::{DatasetKey, META_FRIEND_NAME};
use lcyield_core::types::ColumnData;
use lcyield_io::{Codec, RecordFileWriter};
use lcyield_selection::{Candidate, SelectionConfig};
use lcyield_stats::seeded_rng;
use lcyield_store::{ColumnRef, EventStore};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::fit::{signal_region_yields, MassFitter, SignalRegionYields};
use crate::kinematics::{DecayMomenta, LorentzVector};

/// Largest allowed difference between a row's mass and the mass its sWeight
/// was fitted at, MeV.
pub const MASS_TOLERANCE: f64 = 0.1;

const MOMENTUM_PARTICLES: [&str; 5] = ["Lambdab", "Lambdac", "proton", "h1", "h2"];

/// Deterministic location of the derived columns for `key`.
pub fn meta_path(output_dir: &Path, key: &DatasetKey) -> String {
    output_dir
        .join(format!("meta-{key}.rec"))
        .to_string_lossy()
        .into_owned()
}

/// Attach an existing meta file as the `MetaTree` friend. Returns whether
/// one was found.
pub fn attach_meta(store: &mut EventStore, output_dir: &Path, key: &DatasetKey) -> Result<bool> {
    let path = meta_path(output_dir, key);
    if !store.storage().exists(&path)? {
        return Ok(false);
    }
    store.add_friend(META_FRIEND_NAME, &path)?;
    Ok(true)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaSummary {
    pub path: String,
    pub rows: u64,
    /// Rows passing trigger and preselection, i.e. the fitted sample.
    pub selected: u64,
    pub yields: SignalRegionYields,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaOutcome {
    Built(MetaSummary),
    Reused { path: String },
}

impl MetaOutcome {
    pub fn path(&self) -> &str {
        match self {
            MetaOutcome::Built(s) => &s.path,
            MetaOutcome::Reused { path } => path,
        }
    }
}

struct MomentumCells {
    cells: Vec<[ColumnRef; 4]>,
}

impl MomentumCells {
    fn columns() -> Vec<String> {
        MOMENTUM_PARTICLES
            .iter()
            .flat_map(|p| ["PX", "PY", "PZ", "PE"].map(|c| format!("{p}_{c}")))
            .collect()
    }

    fn bind(store: &mut EventStore) -> Result<Self> {
        store.activate_columns(Self::columns(), true)?;
        let mut cells = Vec::with_capacity(MOMENTUM_PARTICLES.len());
        for p in MOMENTUM_PARTICLES {
            cells.push([
                store.value_ref(&format!("{p}_PX"))?,
                store.value_ref(&format!("{p}_PY"))?,
                store.value_ref(&format!("{p}_PZ"))?,
                store.value_ref(&format!("{p}_PE"))?,
            ]);
        }
        Ok(Self { cells })
    }

    fn vector(&self, k: usize) -> LorentzVector {
        let [px, py, pz, pe] = &self.cells[k];
        LorentzVector::new(px.f64(), py.f64(), pz.f64(), pe.f64())
    }

    fn current(&self) -> DecayMomenta {
        DecayMomenta {
            lambdab: self.vector(0),
            lambdac: self.vector(1),
            proton: self.vector(2),
            h1: self.vector(3),
            h2: self.vector(4),
        }
    }
}

#[derive(Default)]
struct MetaColumns {
    lambdac_m: Vec<f64>,
    random: Vec<f64>,
    accepted: Vec<i32>,
    triggered: Vec<i32>,
    p_h1_m: Vec<f64>,
    p_h2_m: Vec<f64>,
    h1_h2_m: Vec<f64>,
    proton_theta: Vec<f64>,
    proton_phi: Vec<f64>,
    cos_h1_h2_phi: Vec<f64>,
    signal_sw: Vec<f64>,
    background_sw: Vec<f64>,
    sum_sw: Vec<f64>,
}

impl MetaColumns {
    fn write(self, store: &EventStore, path: &str) -> Result<u64> {
        let mut w = RecordFileWriter::new(Codec::None);
        let floats = [
            ("Lambdac_M", self.lambdac_m),
            ("random", self.random),
            ("p_h1_M", self.p_h1_m),
            ("p_h2_M", self.p_h2_m),
            ("h1_h2_M", self.h1_h2_m),
            ("proton_theta", self.proton_theta),
            ("proton_phi", self.proton_phi),
            ("cos_h1_h2_phi", self.cos_h1_h2_phi),
            ("signal_sw", self.signal_sw),
            ("background_sw", self.background_sw),
            ("sum_sw", self.sum_sw),
        ];
        for (name, data) in floats {
            w.add_column(name, ColumnData::F64(data))?;
        }
        w.add_column("accepted", ColumnData::I32(self.accepted))?;
        w.add_column("triggered", ColumnData::I32(self.triggered))?;
        Ok(w.write(store.storage().as_ref(), path)?)
    }
}

/// Computes and persists the `MetaTree` friend of a store.
pub struct MetaBuilder<'a> {
    fitter: &'a dyn MassFitter,
    output_dir: PathBuf,
    selection: SelectionConfig,
    seed: u64,
    force: bool,
}

impl<'a> MetaBuilder<'a> {
    pub fn new(
        fitter: &'a dyn MassFitter,
        output_dir: impl Into<PathBuf>,
        selection: SelectionConfig,
    ) -> Self {
        Self {
            fitter,
            output_dir: output_dir.into(),
            selection,
            seed: 0,
            force: false,
        }
    }

    /// Seed of the `random` column; 0 draws from entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Rebuild even when the meta file exists.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Reuse the meta file of `key` if present, otherwise build it, then
    /// attach it to `store`.
    pub fn ensure(&self, store: &mut EventStore, key: &DatasetKey) -> Result<MetaOutcome> {
        if store.has_friend(META_FRIEND_NAME) {
            return Err(Error::AlreadyAttached(store.name().to_string()));
        }
        let path = meta_path(&self.output_dir, key);
        if !self.force && store.storage().exists(&path)? {
            info!(%key, path = %path, "reusing derived columns");
            store.add_friend(META_FRIEND_NAME, &path)?;
            return Ok(MetaOutcome::Reused { path });
        }
        let summary = self.build(store, key)?;
        store.add_friend(META_FRIEND_NAME, &summary.path)?;
        Ok(MetaOutcome::Built(summary))
    }

    /// Fit the selected candidates and write one meta row per store row.
    pub fn build(&self, store: &mut EventStore, key: &DatasetKey) -> Result<MetaSummary> {
        let path = meta_path(&self.output_dir, key);
        let cand = Candidate::activate_and_bind(store, key.mode, &self.selection.with_meta(false))?;
        let mass_column = cand.spec().mass_column;

        let masses = {
            let mut scoped =
                store.copy_filtered(|| cand.passes_trigger() && cand.passes_preselection())?;
            let copy = scoped.store_mut();
            let m = copy.value_ref(mass_column)?;
            let mut masses = Vec::with_capacity(copy.entries() as usize);
            for entry in copy.iterate() {
                entry?;
                masses.push(m.f64());
            }
            masses
        };
        info!(%key, selected = masses.len(), of = store.entries(), "fitting selected candidates");
        let model = self
            .fitter
            .fit(&masses, cand.spec().shapes_preselection)?;
        let yields = signal_region_yields(model.as_ref());

        let momenta = MomentumCells::bind(store)?;
        let lambdac_m = store.value_ref("Lambdac_M")?;
        let fit_mass = store.value_ref(mass_column)?;
        let mut rng = seeded_rng(self.seed);
        let mut cols = MetaColumns::default();
        let mut sw_entry = 0usize;

        for entry in store.iterate() {
            let row = entry?;
            let accepted = cand.passes_preselection();
            let triggered = cand.passes_trigger();
            let (signal, background, sum) = if accepted && triggered {
                let w = model.weights_for(sw_entry).ok_or_else(|| {
                    Error::Mismatch(format!("no sWeight for selected candidate {sw_entry}"))
                })?;
                let m = fit_mass.f64();
                if (m - w.mass).abs() > MASS_TOLERANCE {
                    return Err(Error::Mismatch(format!(
                        "row {row} has mass {m}, sWeight {sw_entry} was fitted at {}",
                        w.mass
                    )));
                }
                sw_entry += 1;
                (w.signal, w.background, w.sum())
            } else {
                (0.0, 0.0, 0.0)
            };

            let ps = momenta.current().phase_space();
            cols.lambdac_m.push(lambdac_m.f64());
            cols.random.push(rng.gen::<f64>());
            cols.accepted.push(accepted as i32);
            cols.triggered.push(triggered as i32);
            cols.p_h1_m.push(ps.p_h1_m);
            cols.p_h2_m.push(ps.p_h2_m);
            cols.h1_h2_m.push(ps.h1_h2_m);
            cols.proton_theta.push(ps.proton_theta);
            cols.proton_phi.push(ps.proton_phi);
            cols.cos_h1_h2_phi.push(ps.cos_h1_h2_phi);
            cols.signal_sw.push(signal);
            cols.background_sw.push(background);
            cols.sum_sw.push(sum);
        }
        if sw_entry != model.n_rows() {
            return Err(Error::Mismatch(format!(
                "{sw_entry} candidates selected but {} sWeights fitted",
                model.n_rows()
            )));
        }

        let rows = store.entries();
        let bytes = cols.write(store, &path)?;
        debug!(path = %path, bytes, "wrote meta file");
        info!(%key, path = %path, rows, selected = sw_entry, "built derived columns");
        Ok(MetaSummary {
            path,
            rows,
            selected: sw_entry as u64,
            yields,
        })
    }
}
