//! Meta build and efficiency workflows end to end on in-memory ntuples.

mod test_data_gen;

use std::sync::Arc;

use lcyield::core::config::AnalysisConfig;
use lcyield::core::keys::{DatasetKey, DecayMode, McType, Polarity, Year};
use lcyield::exec::{Analysis, EfficiencyKind, ExecError, Report, PKPI_BRANCHING_FRACTION};
use lcyield::io::{MemoryStorage, Storage};
use lcyield::meta::{meta_path, MetaOutcome, SWeightFile, SWeightRow};
use tempfile::TempDir;
use test_data_gen::{flat_table, memory, scratch_dir, write_candidates, write_collision};

const MODE: DecayMode = DecayMode::Ppipi;
const ROWS: usize = 10;

struct Fixture {
    storage: Arc<MemoryStorage>,
    analysis: Analysis,
    _scratch: TempDir,
}

fn fixture() -> Fixture {
    let storage = memory();
    let scratch = scratch_dir();
    let cfg = AnalysisConfig {
        data_dir: "data".into(),
        output_dir: "out".into(),
        scratch_dir: scratch.path().to_path_buf(),
        seed: 11,
        ..AnalysisConfig::default()
    };
    let analysis = Analysis::with_storage(cfg, storage.clone());
    Fixture {
        storage,
        analysis,
        _scratch: scratch,
    }
}

fn key(f: &Fixture, polarity: Polarity) -> DatasetKey {
    f.analysis.key(MODE, polarity, Year::Y2011, true)
}

/// Rows 0..3 fail L0; rows 4 and 5 have a pion pair inside the KS veto.
fn write_sample(f: &Fixture, polarity: Polarity) {
    let k = key(f, polarity);
    let path = f
        .analysis
        .layout()
        .mc_file(MODE, k.year, k.stripping, polarity, McType::Stripped)
        .unwrap();
    write_candidates(
        f.storage.as_ref(),
        &path,
        MODE,
        ROWS,
        |i, col| (col == "mu_L0MuonDecision_TOS" && i < 3).then_some(0.0),
        |i| if i == 4 || i == 5 { 500.0 } else { 700.0 },
    );
}

/// One sWeight row per triggered candidate, fitted at `mass`.
fn sweights(mass: f64) -> SWeightFile {
    SWeightFile::new(
        (3..ROWS)
            .map(|_| SWeightRow {
                mass,
                signal: 0.8,
                background: 0.2,
            })
            .collect(),
    )
}

#[test]
fn meta_is_built_once_then_reused() {
    let f = fixture();
    write_sample(&f, Polarity::MagUp);
    let k = key(&f, Polarity::MagUp);

    let built = f.analysis.build_meta(&k, &sweights(2286.0), false).unwrap();
    let MetaOutcome::Built(summary) = &built else {
        panic!("expected a fresh build, got {built:?}");
    };
    assert_eq!(summary.rows, ROWS as u64);
    assert_eq!(summary.selected, 7);
    assert_eq!(summary.path, meta_path(&f.analysis.config().output_dir, &k));
    assert!(f.storage.exists(&summary.path).unwrap());

    let again = f.analysis.build_meta(&k, &sweights(2286.0), false).unwrap();
    assert!(matches!(again, MetaOutcome::Reused { .. }));
    assert_eq!(again.path(), built.path());
}

#[test]
fn sweights_fitted_at_other_masses_are_rejected() {
    let f = fixture();
    write_sample(&f, Polarity::MagDown);
    let k = key(&f, Polarity::MagDown);
    let err = f
        .analysis
        .build_meta(&k, &sweights(2290.0), false)
        .unwrap_err();
    assert!(matches!(
        err,
        ExecError::Meta(lcyield::meta::Error::Mismatch(_))
    ));
    assert!(!f
        .storage
        .exists(&meta_path(&f.analysis.config().output_dir, &k))
        .unwrap());
}

#[test]
fn ks_veto_reads_the_pair_mass_from_meta() {
    let f = fixture();
    write_sample(&f, Polarity::MagUp);
    let k = key(&f, Polarity::MagUp);

    // without meta there is no pair mass and nothing passes
    assert_eq!(f.analysis.offline(&k).unwrap().value, 0.0);

    f.analysis.build_meta(&k, &sweights(2286.0), false).unwrap();
    assert_eq!(f.analysis.offline(&k).unwrap().value, 0.8);
    // offline rows 0, 1, 2, 3, 6, 7, 8, 9; rows 0..3 fail L0
    assert_eq!(f.analysis.trigger(&k).unwrap().value, 5.0 / 8.0);
}

#[test]
fn tracking_and_report_round_trip() {
    let f = fixture();
    write_sample(&f, Polarity::MagUp);
    let k = key(&f, Polarity::MagUp);
    let table = flat_table(0.97, 0.002);

    let nominal = f.analysis.tracking(&k, &table).unwrap();
    assert!((nominal.value - 0.97f64.powi(4)).abs() < 1e-12);
    let smeared = f.analysis.tracking_smeared(&k, &table, 20).unwrap();
    assert!((smeared.value - nominal.value).abs() < 0.01);
    assert!(smeared.error > 0.0);

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("reports").join("ppipi.json");
    let analysis = Analysis::with_storage(f.analysis.config().clone(), f.storage.clone())
        .with_tracking_table(table)
        .with_toys(5);
    let report = analysis
        .report(&[k], &[EfficiencyKind::Tracking, EfficiencyKind::Pid])
        .unwrap();
    report.write(&path).unwrap();

    let back = Report::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back.efficiencies.len(), 2);
    let tracking = back
        .get(MODE, Polarity::MagUp, Year::Y2011, EfficiencyKind::Tracking)
        .unwrap();
    assert!((tracking.value - nominal.value).abs() < 1e-9);
}

/// Signal MC for pKpi and pKK at every stage plus one collision sample
/// shared by both. pKK loses its first eight stripped candidates to L0 and
/// ten collision candidates to the h2 kaon PID; the last ten collision
/// candidates sit in the lower sideband.
fn write_branching_samples(f: &Fixture) {
    for mode in [DecayMode::PKpi, DecayMode::PKK] {
        let k = f.analysis.key(mode, Polarity::MagUp, Year::Y2011, true);
        for (sample, rows) in [
            (McType::Generated, 400),
            (McType::Cheated, 100),
            (McType::Stripped, 40),
        ] {
            let path = f
                .analysis
                .layout()
                .mc_file(mode, k.year, k.stripping, Polarity::MagUp, sample)
                .unwrap();
            let fails_l0 = mode == DecayMode::PKK && sample == McType::Stripped;
            write_candidates(
                f.storage.as_ref(),
                &path,
                mode,
                rows,
                |i, col| (fails_l0 && col == "mu_L0MuonDecision_TOS" && i < 8).then_some(0.0),
                |_| 700.0,
            );
        }
    }
    let k = f.analysis.key(DecayMode::PKK, Polarity::MagUp, Year::Y2011, false);
    write_collision(
        f.storage.as_ref(),
        &f.analysis.layout().collision_file(k.year, k.stripping, Polarity::MagUp),
        &[DecayMode::PKpi, DecayMode::PKK],
        60,
        |i, col| match col {
            "h2_ProbNNk" if i < 10 => Some(0.1),
            "Lambdac_M" if i >= 50 => Some(2230.0),
            _ => None,
        },
    );
}

#[test]
fn branching_fraction_relative_to_pkpi() {
    let f = fixture();
    write_branching_samples(&f);
    let analysis = Analysis::with_storage(f.analysis.config().clone(), f.storage.clone())
        .with_tracking_table(flat_table(0.97, 0.002))
        .with_toys(5);
    let key = analysis.key(DecayMode::PKK, Polarity::MagUp, Year::Y2011, false);

    let report = analysis.branching(&[key]).unwrap();
    assert_eq!(report.yields.len(), 2);
    assert_eq!(report.branching.len(), 2);
    assert_eq!(report.efficiencies.len(), 2 * EfficiencyKind::CHAIN.len());

    let (up, y) = (Polarity::MagUp, Year::Y2011);
    let r = 36.0 / 104.0;
    let pkpi_yield = report.signal_yield(DecayMode::PKpi, up, y).unwrap();
    let pkk_yield = report.signal_yield(DecayMode::PKK, up, y).unwrap();
    assert!((pkpi_yield.value - (50.0 - 10.0 * r)).abs() < 1e-9);
    assert!((pkk_yield.value - (40.0 - 10.0 * r)).abs() < 1e-9);

    let trigger = report.get(DecayMode::PKK, up, y, EfficiencyKind::Trigger).unwrap();
    assert_eq!(trigger.value, 32.0 / 40.0);
    let total = report.total(DecayMode::PKK, up, y).unwrap();
    let factors: f64 = EfficiencyKind::CHAIN
        .iter()
        .map(|&k| report.get(DecayMode::PKK, up, y, k).unwrap().value)
        .product();
    assert!((total.value - factors).abs() < 1e-15);

    let kk = report
        .branching
        .iter()
        .find(|b| b.mode == DecayMode::PKK)
        .unwrap();
    let expected = (pkk_yield.value / total.value)
        / (pkpi_yield.value / report.total(DecayMode::PKpi, up, y).unwrap().value);
    assert!((kk.relative.value - expected).abs() < 1e-9);
    assert!((kk.absolute.value - expected * PKPI_BRANCHING_FRACTION.value).abs() < 1e-9);
    assert!(kk.absolute.error > kk.relative.error * PKPI_BRANCHING_FRACTION.value);
}
