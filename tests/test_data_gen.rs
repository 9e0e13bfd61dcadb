//! Synthetic ntuples shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use lcyield::core::keys::DecayMode;
use lcyield::core::types::ColumnData;
use lcyield::io::{Codec, MemoryStorage, RecordFileWriter, Storage};
use lcyield::selection::{required_columns, Decision, SelectionConfig, TriggerNaming};
use lcyield::stats::ReferenceTable;
use tempfile::TempDir;

pub const PION_MASS: f64 = 139.570;
pub const PROTON_MASS: f64 = 938.272;

pub fn memory() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

pub fn scratch_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("lcyield-test-")
        .tempdir()
        .expect("create scratch dir")
}

pub fn write_columns(storage: &dyn Storage, path: &str, columns: Vec<(&str, ColumnData)>) {
    let mut w = RecordFileWriter::new(Codec::None);
    for (name, data) in columns {
        w.add_column(name, data).expect("add column");
    }
    w.write(storage, path).expect("write record file");
}

/// A value that passes every selection requirement of `mode` on `col`.
pub fn passing_value(mode: DecayMode, col: &str) -> f64 {
    match col {
        "Lambdac_M" | "Lambdab_DTF_Lambdac_M" => 2286.0,
        c if c.ends_with("_P") => 20e3,
        c if c.ends_with("_ETA") => 3.0,
        c if c.ends_with("_TOS") || c.ends_with("_TIS") => 1.0,
        c if c.contains("ProbNN") => 0.9,
        c if c.ends_with("_PIDp") => 30.0,
        "proton_PIDK" => 5.0,
        c if c.ends_with("_PIDK") => match (mode, c) {
            (DecayMode::PKpi, "h2_PIDK") | (DecayMode::Ppipi, _) => -5.0,
            _ => 15.0,
        },
        "nTracks" => 150.0,
        "Lambdab_DTF_CHI2" => 4.0,
        "Lambdab_BKGCAT" => 50.0,
        "Lambdac_BKGCAT" => 10.0,
        _ => 0.0,
    }
}

/// Four-momenta `(PX, PY, PZ, PE)` whose two pions have invariant mass
/// `pair_mass`.
fn momenta(pair_mass: f64) -> [(&'static str, [f64; 4]); 5] {
    let pz = 10_000.0;
    let e1 = (pz * pz + PION_MASS * PION_MASS).sqrt();
    let e2 = (pair_mass * pair_mass + 4.0 * pz * pz).sqrt() - e1;
    let proton = [400.0, 300.0, 40_000.0, (400.0f64.powi(2) + 300.0f64.powi(2) + 40_000.0f64.powi(2) + PROTON_MASS * PROTON_MASS).sqrt()];
    let h1 = [0.0, 0.0, pz, e1];
    let h2 = [0.0, 0.0, pz, e2];
    let lc = [
        proton[0] + h1[0] + h2[0],
        proton[1] + h1[1] + h2[1],
        proton[2] + h1[2] + h2[2],
        proton[3] + h1[3] + h2[3],
    ];
    let mu = [800.0, -600.0, 25_000.0, (800.0f64.powi(2) + 600.0f64.powi(2) + 25_000.0f64.powi(2) + 105.658f64.powi(2)).sqrt()];
    let lb = [lc[0] + mu[0], lc[1] + mu[1], lc[2] + mu[2], lc[3] + mu[3]];
    [
        ("Lambdab", lb),
        ("Lambdac", lc),
        ("proton", proton),
        ("h1", h1),
        ("h2", h2),
    ]
}

/// One candidate per row. Every selection column of `mode`, the muon
/// kinematics and the TIS lines pass unless `over(row, column)` says
/// otherwise; momentum columns give the pion pair the mass `pair_mass(row)`.
pub fn write_candidates(
    storage: &dyn Storage,
    path: &str,
    mode: DecayMode,
    rows: usize,
    over: impl Fn(usize, &str) -> Option<f64>,
    pair_mass: impl Fn(usize) -> f64,
) {
    write_rows(storage, path, &[mode], rows, over, pair_mass);
}

/// [`write_candidates`] with the selection columns of several modes, as in
/// a collision ntuple shared between them.
pub fn write_collision(
    storage: &dyn Storage,
    path: &str,
    modes: &[DecayMode],
    rows: usize,
    over: impl Fn(usize, &str) -> Option<f64>,
) {
    write_rows(storage, path, modes, rows, over, |_| 700.0);
}

fn write_rows(
    storage: &dyn Storage,
    path: &str,
    modes: &[DecayMode],
    rows: usize,
    over: impl Fn(usize, &str) -> Option<f64>,
    pair_mass: impl Fn(usize) -> f64,
) {
    let cfg = SelectionConfig {
        mc: true,
        ..SelectionConfig::default()
    };
    let mut names: Vec<String> = Vec::new();
    let extra = ["mu_P".to_string(), "mu_ETA".to_string()]
        .into_iter()
        .chain(TriggerNaming::Standard.lines(Decision::Tis));
    for name in modes
        .iter()
        .flat_map(|&m| required_columns(m, &cfg))
        .chain(extra)
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    let mode = modes[0];
    let mut columns: Vec<(String, Vec<f64>)> = names
        .into_iter()
        .map(|col| {
            let values = (0..rows)
                .map(|i| over(i, &col).unwrap_or_else(|| passing_value(mode, &col)))
                .collect();
            (col, values)
        })
        .collect();

    for (k, comp) in ["PX", "PY", "PZ", "PE"].iter().enumerate() {
        for (p, particle) in ["Lambdab", "Lambdac", "proton", "h1", "h2"].iter().enumerate() {
            let values = (0..rows).map(|i| momenta(pair_mass(i))[p].1[k]).collect();
            columns.push((format!("{particle}_{comp}"), values));
        }
    }

    write_columns(
        storage,
        path,
        columns
            .iter()
            .map(|(n, v)| (n.as_str(), ColumnData::F64(v.clone())))
            .collect(),
    );
}

/// Two momentum bins by two pseudorapidity bins, every bin at `value`.
pub fn flat_table(value: f64, error: f64) -> ReferenceTable {
    ReferenceTable::new(
        vec![0.0, 10.0, 200.0],
        vec![1.5, 3.5, 5.0],
        vec![value; 4],
        vec![error; 4],
    )
    .expect("valid table")
}
