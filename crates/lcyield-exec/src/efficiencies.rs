//! Efficiency workflows. Most read the signal MC of a key, whatever the
//! key's own `mc` flag; the data-driven ones read its collision data and
//! fit the candidate mass, and the tabulated ones read nothing.

use lcyield_core::keys::{DatasetKey, DecayMode, McType};
use lcyield_meta::{signal_region_yields, SignalRegionYields};
use lcyield_selection::{Candidate, Decision, FitShapes, TriggerLines, TRUTH_MATCH_CUT};
use lcyield_stats::{
    acceptance_efficiency, build_spectra, efficiency_from_counts, pid_efficiency, run_n_toys,
    tracking_efficiency, yield_ratio, EfficiencyResult, ReferenceTable, Spectrum,
    TRACKING_TRACKS,
};
use lcyield_store::{Cut, EventStore};
use tracing::info;

use crate::error::Result;
use crate::report::{EfficiencyKind, Report};
use crate::runtime::Analysis;

fn mc(key: &DatasetKey) -> DatasetKey {
    DatasetKey { mc: true, ..*key }
}

fn data(key: &DatasetKey) -> DatasetKey {
    DatasetKey { mc: false, ..*key }
}

/// Pass and total counts of truth-matched candidates.
struct Tally {
    pass: u64,
    total: u64,
}

impl Tally {
    fn efficiency(&self) -> Result<EfficiencyResult> {
        Ok(efficiency_from_counts(self.pass, self.total)?)
    }
}

/// Candidate masses before and after the requirement under study.
#[derive(Default)]
struct MassSamples {
    before: Vec<f64>,
    after: Vec<f64>,
}

impl MassSamples {
    fn fill(&mut self, mass: f64, before: bool, after: bool) {
        if before {
            self.before.push(mass);
            if after {
                self.after.push(mass);
            }
        }
    }
}

impl Analysis {
    /// Candidates of `key` with the meta friend attached when built.
    fn candidates(&self, key: DatasetKey) -> Result<(EventStore, Candidate)> {
        let (mut store, with_meta) = self.open_with_meta(&key, McType::Stripped)?;
        let selection = self.selection(&key).with_meta(with_meta);
        let cand = Candidate::activate_and_bind(&mut store, key.mode, &selection)?;
        Ok((store, cand))
    }

    /// Fit `masses` with the configured fitter and keep the yields within
    /// three widths of the signal mean.
    pub fn fit_yields(&self, masses: &[f64], shapes: FitShapes) -> Result<SignalRegionYields> {
        let model = self.fitter().fit(masses, shapes)?;
        Ok(signal_region_yields(model.as_ref()))
    }

    /// Ratio of the fitted signal yields after and before a requirement.
    fn fitted_ratio(
        &self,
        key: &DatasetKey,
        samples: &MassSamples,
        shapes: FitShapes,
    ) -> Result<EfficiencyResult> {
        let before = self.fit_yields(&samples.before, shapes)?;
        let after = self.fit_yields(&samples.after, shapes)?;
        info!(%key, before = %before.signal, after = %after.signal, "fitted signal yields");
        Ok(yield_ratio(after.signal, before.signal)?)
    }

    /// Signal and background of the fully selected collision data.
    pub fn selected_yields(&self, key: &DatasetKey) -> Result<SignalRegionYields> {
        let (mut store, cand) = self.candidates(data(key))?;
        let mut masses = Vec::new();
        for entry in store.iterate() {
            entry?;
            if cand.passes_selection() {
                masses.push(cand.mass());
            }
        }
        let yields = self.fit_yields(&masses, cand.spec().shapes_postselection)?;
        info!(%key, selected = masses.len(), signal = %yields.signal,
            background = %yields.background, "selected yields");
        Ok(yields)
    }

    fn track_spectra(&self, key: &DatasetKey, table: &ReferenceTable) -> Result<Vec<Spectrum>> {
        let mut store = self.open(&mc(key), McType::Stripped)?;
        let spectra = build_spectra(&mut store, &TRACKING_TRACKS, table, self.config().momentum_scale)?;
        Ok(spectra.into_iter().map(|(_, s)| s).collect())
    }

    /// Tracking efficiency ratio: the table reweighted to each track's
    /// (P, ETA) spectrum, multiplied over the four tracks.
    pub fn tracking(&self, key: &DatasetKey, table: &ReferenceTable) -> Result<EfficiencyResult> {
        let spectra = self.track_spectra(key, table)?;
        let eff = tracking_efficiency(&spectra, table)?;
        info!(%key, %eff, "tracking efficiency");
        Ok(eff)
    }

    /// Tracking efficiency with the table's errors propagated by `toys`
    /// smeared copies.
    pub fn tracking_smeared(
        &self,
        key: &DatasetKey,
        table: &ReferenceTable,
        toys: u64,
    ) -> Result<EfficiencyResult> {
        let spectra = self.track_spectra(key, table)?;
        let eff = run_n_toys(toys, &spectra, table)?;
        info!(%key, toys, %eff, "smeared tracking efficiency");
        Ok(eff)
    }

    /// Truth-matched stripped candidates passing the offline selection.
    pub fn offline(&self, key: &DatasetKey) -> Result<EfficiencyResult> {
        let (mut store, cand) = self.candidates(mc(key))?;
        let mut tally = Tally { pass: 0, total: 0 };
        for entry in store.iterate() {
            entry?;
            if cand.is_truth_matched() {
                tally.total += 1;
                if cand.passes_offline() {
                    tally.pass += 1;
                }
            }
        }
        let eff = tally.efficiency()?;
        info!(%key, pass = tally.pass, total = tally.total, %eff, "offline efficiency");
        Ok(eff)
    }

    /// Trigger efficiency of truth-matched candidates already passing the
    /// offline selection.
    pub fn trigger(&self, key: &DatasetKey) -> Result<EfficiencyResult> {
        let (mut store, cand) = self.candidates(mc(key))?;
        let mut tally = Tally { pass: 0, total: 0 };
        for entry in store.iterate() {
            entry?;
            if cand.is_truth_matched() && cand.passes_offline() {
                tally.total += 1;
                if cand.passes_trigger() {
                    tally.pass += 1;
                }
            }
        }
        let eff = tally.efficiency()?;
        info!(%key, pass = tally.pass, total = tally.total, %eff, "trigger efficiency");
        Ok(eff)
    }

    /// Trigger efficiency of truth-matched candidates before any stripping
    /// or offline requirement.
    pub fn trigger_pre_stripping(&self, key: &DatasetKey) -> Result<EfficiencyResult> {
        let key = mc(key);
        let mut store = self.open(&key, McType::Cheated)?;
        let truth = Cut::parse(TRUTH_MATCH_CUT)?;
        store.activate_columns(truth.columns(), false)?;
        let truth = truth.bind(&store)?;
        let naming = self.selection(&key).trigger_naming;
        let tos = TriggerLines::activate_and_bind(&mut store, naming, Decision::Tos)?;

        let mut tally = Tally { pass: 0, total: 0 };
        for entry in store.iterate() {
            entry?;
            if truth.eval() {
                tally.total += 1;
                if tos.passes() {
                    tally.pass += 1;
                }
            }
        }
        let eff = tally.efficiency()?;
        info!(%key, pass = tally.pass, total = tally.total, %eff, "pre-stripping trigger efficiency");
        Ok(eff)
    }

    /// Trigger efficiency on collision data: the TOS fraction of offline
    /// candidates triggered independently of the signal (TIS), by fitted
    /// yield.
    pub fn trigger_tistos(&self, key: &DatasetKey) -> Result<EfficiencyResult> {
        let (mut store, cand) = self.candidates(data(key))?;
        let naming = self.selection(&data(key)).trigger_naming;
        let tis = TriggerLines::activate_and_bind(&mut store, naming, Decision::Tis)?;
        let mut samples = MassSamples::default();
        for entry in store.iterate() {
            entry?;
            let before = tis.passes() && cand.passes_offline();
            samples.fill(cand.mass(), before, cand.passes_trigger());
        }
        let eff = self.fitted_ratio(key, &samples, cand.spec().shapes_postselection)?;
        info!(%key, tis = samples.before.len(), tistos = samples.after.len(), %eff,
            "TISTOS trigger efficiency");
        Ok(eff)
    }

    /// Offline efficiency on collision data: fitted yields of triggered,
    /// PID-selected candidates with and without the offline selection.
    pub fn offline_data(&self, key: &DatasetKey) -> Result<EfficiencyResult> {
        let (mut store, cand) = self.candidates(data(key))?;
        let mut samples = MassSamples::default();
        for entry in store.iterate() {
            entry?;
            let before = cand.passes_trigger() && cand.passes_pid();
            samples.fill(cand.mass(), before, cand.passes_offline());
        }
        let eff = self.fitted_ratio(key, &samples, cand.spec().shapes_postselection)?;
        info!(%key, before = samples.before.len(), after = samples.after.len(), %eff,
            "data-driven offline efficiency");
        Ok(eff)
    }

    /// Truth-matched candidates surviving the stripping, relative to the
    /// cheated sample.
    pub fn stripping(&self, key: &DatasetKey) -> Result<EfficiencyResult> {
        let key = mc(key);
        let pass = self.open(&key, McType::Stripped)?.count(TRUTH_MATCH_CUT)?;
        let total = self.open(&key, McType::Cheated)?.count(TRUTH_MATCH_CUT)?;
        let eff = efficiency_from_counts(pass, total)?;
        info!(%key, pass, total, %eff, "stripping efficiency");
        Ok(eff)
    }

    /// Reconstructed (cheated) entries over generated entries.
    pub fn reconstruction(&self, key: &DatasetKey) -> Result<EfficiencyResult> {
        let key = mc(key);
        let pass = self.open(&key, McType::Cheated)?.count("")?;
        let total = self.open(&key, McType::Generated)?.count("")?;
        let eff = efficiency_from_counts(pass, total)?;
        info!(%key, pass, total, %eff, "reconstruction efficiency");
        Ok(eff)
    }

    pub fn pid(&self, key: &DatasetKey) -> Result<EfficiencyResult> {
        Ok(pid_efficiency(key.mode, key.polarity, key.year, key.stripping)?)
    }

    pub fn acceptance(&self, key: &DatasetKey) -> Result<EfficiencyResult> {
        Ok(acceptance_efficiency(key.mode, key.polarity, key.year)?)
    }

    pub fn efficiency(&self, key: &DatasetKey, kind: EfficiencyKind) -> Result<EfficiencyResult> {
        match kind {
            EfficiencyKind::Acceptance => self.acceptance(key),
            EfficiencyKind::Reconstruction => self.reconstruction(key),
            EfficiencyKind::Stripping => self.stripping(key),
            EfficiencyKind::Tracking => self.tracking(key, &self.tracking_table()?),
            EfficiencyKind::TrackingSmeared => {
                self.tracking_smeared(key, &self.tracking_table()?, self.toys())
            }
            EfficiencyKind::Offline => self.offline(key),
            EfficiencyKind::Trigger => self.trigger(key),
            EfficiencyKind::TriggerPreStripping => self.trigger_pre_stripping(key),
            EfficiencyKind::TriggerTisTos => self.trigger_tistos(key),
            EfficiencyKind::OfflineData => self.offline_data(key),
            EfficiencyKind::Pid => self.pid(key),
        }
    }

    /// Every `kind` for every key, in order. The first failure aborts.
    pub fn report(&self, keys: &[DatasetKey], kinds: &[EfficiencyKind]) -> Result<Report> {
        let mut report = Report::new(self.config())?;
        for key in keys {
            for &kind in kinds {
                let eff = self.efficiency(key, kind)?;
                report.push(key, kind, eff);
            }
        }
        Ok(report.finish())
    }

    /// The efficiency chain and the selected yield of every key, rolled up
    /// into branching fractions relative to pKpi. The pKpi keys are added
    /// when missing.
    pub fn branching(&self, keys: &[DatasetKey]) -> Result<Report> {
        let mut all: Vec<DatasetKey> = Vec::with_capacity(keys.len() + 1);
        for key in keys {
            let reference = DatasetKey {
                mode: DecayMode::PKpi,
                ..*key
            };
            for k in [reference, *key] {
                if !all.iter().any(|a| a.mode == k.mode && a.polarity == k.polarity && a.year == k.year) {
                    all.push(k);
                }
            }
        }

        let mut report = Report::new(self.config())?;
        for key in &all {
            for kind in EfficiencyKind::CHAIN {
                let eff = self.efficiency(key, kind)?;
                report.push(key, kind, eff);
            }
            let yields = self.selected_yields(key)?;
            report.push_yield(key, yields.signal, yields.background);
        }
        report.roll_up()?;
        Ok(report.finish())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lcyield_core::config::AnalysisConfig;
    use lcyield_core::keys::{DecayMode, Polarity, Year};
    use lcyield_core::types::ColumnData;
    use lcyield_io::{Codec, MemoryStorage, RecordFileWriter, Storage};
    use lcyield_selection::{required_columns, SelectionConfig, TriggerNaming};

    use super::*;
    use crate::error::ExecError;

    const MODE: DecayMode = DecayMode::PKK;

    fn analysis(storage: Arc<MemoryStorage>) -> Analysis {
        let cfg = AnalysisConfig {
            data_dir: "data".into(),
            output_dir: "out".into(),
            ..AnalysisConfig::default()
        };
        Analysis::with_storage(cfg, storage)
    }

    fn key(polarity: Polarity) -> DatasetKey {
        DatasetKey::new(MODE, polarity, Year::Y2011, false, true)
    }

    fn passing(col: &str) -> f64 {
        match col {
            "Lambdac_M" => 2286.0,
            c if c.ends_with("_P") => 20e3,
            c if c.ends_with("_ETA") => 3.0,
            c if c.ends_with("_TOS") || c.ends_with("_TIS") => 1.0,
            c if c.contains("ProbNN") => 0.9,
            c if c.ends_with("_PIDp") => 30.0,
            "proton_PIDK" => 5.0,
            c if c.ends_with("_PIDK") => 15.0,
            "nTracks" => 150.0,
            "Lambdab_BKGCAT" => 50.0,
            "Lambdac_BKGCAT" => 10.0,
            _ => 0.0,
        }
    }

    /// Writes `rows` candidates that pass everything, muon kinematics and TIS
    /// lines included, with overrides.
    fn write_sample(storage: &dyn Storage, path: &str, n: usize, over: impl Fn(usize, &str) -> Option<f64>) {
        let cfg = SelectionConfig {
            mc: true,
            ..SelectionConfig::default()
        };
        let mut w = RecordFileWriter::new(Codec::None);
        let mut cols = required_columns(MODE, &cfg);
        cols.extend(["mu_P".to_string(), "mu_ETA".to_string()]);
        cols.extend(TriggerNaming::Standard.lines(Decision::Tis));
        for col in cols {
            let values = (0..n).map(|i| over(i, &col).unwrap_or(passing(&col))).collect();
            w.add_column(col, ColumnData::F64(values)).unwrap();
        }
        w.write(storage, path).unwrap();
    }

    fn mc_path(a: &Analysis, polarity: Polarity, sample: McType) -> String {
        let k = key(polarity);
        a.layout()
            .mc_file(MODE, k.year, k.stripping, polarity, sample)
            .unwrap()
    }

    #[test]
    fn offline_counts_truth_matched_only() {
        let storage = Arc::new(MemoryStorage::new());
        let a = analysis(storage.clone());
        // rows 0..10: 0..2 not truth matched, 2..5 fail the mass window
        write_sample(storage.as_ref(), &mc_path(&a, Polarity::MagUp, McType::Stripped), 10, |i, c| {
            match c {
                "Lambdac_BKGCAT" if i < 2 => Some(30.0),
                "Lambdac_M" if (2..5).contains(&i) => Some(2400.0),
                _ => None,
            }
        });
        let eff = a.offline(&key(Polarity::MagUp)).unwrap();
        assert_eq!(eff.value, 5.0 / 8.0);
    }

    #[test]
    fn trigger_is_relative_to_offline() {
        let storage = Arc::new(MemoryStorage::new());
        let a = analysis(storage.clone());
        // 8 rows: 0..2 fail offline, 2..4 fail L0
        write_sample(storage.as_ref(), &mc_path(&a, Polarity::MagDown, McType::Stripped), 8, |i, c| {
            match c {
                "nTracks" if i < 2 => Some(900.0),
                "mu_L0MuonDecision_TOS" if (2..4).contains(&i) => Some(0.0),
                _ => None,
            }
        });
        let eff = a.trigger(&key(Polarity::MagDown)).unwrap();
        assert_eq!(eff.value, 4.0 / 6.0);
    }

    fn data_path(a: &Analysis, polarity: Polarity) -> String {
        let k = key(polarity);
        a.layout().collision_file(k.year, k.stripping, polarity)
    }

    /// Background under the default signal window per sideband candidate.
    const SIDEBAND_SCALE: f64 = 36.0 / 104.0;

    #[test]
    fn pre_stripping_trigger_on_cheated_truth() {
        let storage = Arc::new(MemoryStorage::new());
        let a = analysis(storage.clone());
        // 0..2 not truth matched, 2..5 fail HLT1; the offline selection is not applied
        write_sample(storage.as_ref(), &mc_path(&a, Polarity::MagUp, McType::Cheated), 10, |i, c| {
            match c {
                "Lambdac_BKGCAT" if i < 2 => Some(30.0),
                "mu_Hlt1TrackMuonDecision_TOS" if (2..5).contains(&i) => Some(0.0),
                "nTracks" => Some(900.0),
                _ => None,
            }
        });
        let eff = a.trigger_pre_stripping(&key(Polarity::MagUp)).unwrap();
        assert_eq!(eff.value, 5.0 / 8.0);
        assert_eq!(
            a.efficiency(&key(Polarity::MagUp), EfficiencyKind::TriggerPreStripping)
                .unwrap(),
            eff
        );
    }

    #[test]
    fn tistos_trigger_uses_fitted_yields() {
        let storage = Arc::new(MemoryStorage::new());
        let a = analysis(storage.clone());
        // 0..2 not TIS, 2..4 TIS but not TOS, row 9 in the lower sideband
        write_sample(storage.as_ref(), &data_path(&a, Polarity::MagUp), 10, |i, c| match c {
            "mu_L0MuonDecision_TIS" if i < 2 => Some(0.0),
            "mu_L0MuonDecision_TOS" if (2..4).contains(&i) => Some(0.0),
            "Lambdac_M" if i == 9 => Some(2230.0),
            _ => None,
        });
        let eff = a.trigger_tistos(&key(Polarity::MagUp)).unwrap();
        let expected = (5.0 - SIDEBAND_SCALE) / (7.0 - SIDEBAND_SCALE);
        assert!((eff.value - expected).abs() < 1e-12);
        assert!(eff.error > 0.0);
    }

    #[test]
    fn data_offline_is_relative_to_trigger_and_pid() {
        let storage = Arc::new(MemoryStorage::new());
        let a = analysis(storage.clone());
        // 0 fails L0, 1 fails PID, 2..4 fail the track multiplicity
        write_sample(storage.as_ref(), &data_path(&a, Polarity::MagDown), 10, |i, c| match c {
            "mu_L0MuonDecision_TOS" if i == 0 => Some(0.0),
            "h1_ProbNNk" if i == 1 => Some(0.1),
            "nTracks" if (2..4).contains(&i) => Some(900.0),
            _ => None,
        });
        let eff = a.offline_data(&key(Polarity::MagDown)).unwrap();
        assert!((eff.value - 0.75).abs() < 1e-12);
        let y = a.selected_yields(&key(Polarity::MagDown)).unwrap();
        assert_eq!(y.signal.value, 6.0);
        assert_eq!(y.background.value, 0.0);
    }

    #[test]
    fn data_efficiencies_without_candidates_fail() {
        let storage = Arc::new(MemoryStorage::new());
        let a = analysis(storage.clone());
        write_sample(storage.as_ref(), &data_path(&a, Polarity::MagUp), 3, |_, c| {
            (c == "mu_L0MuonDecision_TIS").then_some(0.0)
        });
        let err = a.trigger_tistos(&key(Polarity::MagUp)).unwrap_err();
        assert!(matches!(err, ExecError::Stats(lcyield_stats::Error::Division(_))));
    }

    #[test]
    fn combined_polarity_chains_both_samples() {
        let storage = Arc::new(MemoryStorage::new());
        let a = analysis(storage.clone());
        write_sample(storage.as_ref(), &mc_path(&a, Polarity::MagUp, McType::Stripped), 4, |i, c| {
            (c == "Lambdac_M" && i == 0).then_some(2400.0)
        });
        write_sample(storage.as_ref(), &mc_path(&a, Polarity::MagDown, McType::Stripped), 4, |_, _| None);
        let eff = a.offline(&key(Polarity::Combined)).unwrap();
        assert_eq!(eff.value, 7.0 / 8.0);
    }

    #[test]
    fn stripping_and_reconstruction_ratios() {
        let storage = Arc::new(MemoryStorage::new());
        let a = analysis(storage.clone());
        let up = Polarity::MagUp;
        write_sample(storage.as_ref(), &mc_path(&a, up, McType::Stripped), 5, |_, _| None);
        write_sample(storage.as_ref(), &mc_path(&a, up, McType::Cheated), 20, |i, c| {
            (c == "Lambdab_BKGCAT" && i >= 10).then_some(70.0)
        });
        write_sample(storage.as_ref(), &mc_path(&a, up, McType::Generated), 80, |_, _| None);

        assert_eq!(a.stripping(&key(up)).unwrap().value, 0.5);
        assert_eq!(a.reconstruction(&key(up)).unwrap().value, 0.25);
    }

    #[test]
    fn missing_sample_is_not_found() {
        let a = analysis(Arc::new(MemoryStorage::new()));
        let err = a.reconstruction(&key(Polarity::MagUp)).unwrap_err();
        assert!(matches!(err, ExecError::Store(lcyield_store::Error::NotFound(_))));
    }

    #[test]
    fn flat_tracking_table_gives_its_fourth_power() {
        let storage = Arc::new(MemoryStorage::new());
        let a = analysis(storage.clone());
        write_sample(storage.as_ref(), &mc_path(&a, Polarity::MagUp, McType::Stripped), 6, |_, _| None);
        let table = ReferenceTable::new(
            vec![0.0, 10.0, 100.0],
            vec![1.5, 3.5, 5.0],
            vec![0.9; 4],
            vec![0.0; 4],
        )
        .unwrap();
        let nominal = a.tracking(&key(Polarity::MagUp), &table).unwrap();
        assert!((nominal.value - 0.9f64.powi(4)).abs() < 1e-12);

        // zero errors leave every toy at the nominal value
        let smeared = a.tracking_smeared(&key(Polarity::MagUp), &table, 5).unwrap();
        assert!((smeared.value - nominal.value).abs() < 1e-12);
        assert!(smeared.error < 1e-12);
    }

    #[test]
    fn report_collects_tabulated_kinds() {
        let a = analysis(Arc::new(MemoryStorage::new()));
        let keys = [key(Polarity::MagUp), key(Polarity::Combined)];
        let r = a
            .report(&keys, &[EfficiencyKind::Pid, EfficiencyKind::Acceptance])
            .unwrap();
        assert_eq!(r.efficiencies.len(), 4);
        let combined = r
            .get(MODE, Polarity::Combined, Year::Y2011, EfficiencyKind::Pid)
            .unwrap();
        assert!(combined.value > 0.0 && combined.value < 1.0);
    }
}
