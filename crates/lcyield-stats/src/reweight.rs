//! Reweighting a reference efficiency table to a sample's kinematics.

use lcyield_store::EventStore;
use tracing::{debug, info};

use crate::efficiency::EfficiencyResult;
use crate::error::{Error, Result};
use crate::hist2d::{ReferenceTable, Spectrum};

/// Tracks whose tracking efficiencies multiply into the candidate's.
pub const TRACKING_TRACKS: [&str; 4] = ["mu", "proton", "h1", "h2"];

/// Fill one spectrum over `(x_col, y_col)`, multiplying `x` by `x_scale`.
///
/// Both columns are activated in addition to the store's current set.
pub fn build_spectrum(
    store: &mut EventStore,
    (x_col, y_col): (&str, &str),
    table: &ReferenceTable,
    x_scale: f64,
) -> Result<Spectrum> {
    store.activate_columns([x_col, y_col], true)?;
    let x = store.value_ref(x_col)?;
    let y = store.value_ref(y_col)?;
    let mut spectrum = Spectrum::for_table(table);
    for entry in store.iterate() {
        entry?;
        spectrum.fill(x.f64() * x_scale, y.f64(), 1.0);
    }
    debug!(store = store.name(), x_col, y_col, entries = spectrum.entries(), "filled spectrum");
    Ok(spectrum)
}

/// One `{track}_P` / `{track}_ETA` spectrum per track, filled in a single
/// pass. Momenta are multiplied by `momentum_scale`.
pub fn build_spectra(
    store: &mut EventStore,
    tracks: &[&str],
    table: &ReferenceTable,
    momentum_scale: f64,
) -> Result<Vec<(String, Spectrum)>> {
    let columns: Vec<(String, String)> = tracks
        .iter()
        .map(|t| (format!("{t}_P"), format!("{t}_ETA")))
        .collect();
    store.activate_columns(columns.iter().flat_map(|(p, eta)| [p, eta]), true)?;

    let mut cells = Vec::with_capacity(tracks.len());
    for (p, eta) in &columns {
        cells.push((store.value_ref(p)?, store.value_ref(eta)?));
    }
    let mut spectra: Vec<Spectrum> = tracks.iter().map(|_| Spectrum::for_table(table)).collect();

    info!(store = store.name(), tracks = tracks.len(), "filling track spectra");
    for entry in store.iterate() {
        entry?;
        for ((p, eta), spectrum) in cells.iter().zip(spectra.iter_mut()) {
            spectrum.fill(p.f64() * momentum_scale, eta.f64(), 1.0);
        }
    }
    Ok(tracks.iter().map(|t| t.to_string()).zip(spectra).collect())
}

/// Table entry of the bin holding (x, y); outside values clamp to the
/// nearest edge bin.
pub fn lookup(x: f64, y: f64, table: &ReferenceTable) -> EfficiencyResult {
    let i = table.x().bin(x);
    let j = table.y().bin(y);
    EfficiencyResult::new(table.value(i, j), table.error(i, j))
}

/// Weighted mean of the table over the spectrum, `sum(w * r) / sum(w)`, with
/// error `sqrt(sum((w * e)^2)) / sum(w)`.
///
/// Bins are treated as uncorrelated.
pub fn total_efficiency(spectrum: &Spectrum, table: &ReferenceTable) -> Result<EfficiencyResult> {
    if !spectrum.matches(table) {
        return Err(Error::InvalidArgument(
            "spectrum and reference table are binned differently".into(),
        ));
    }
    let total = spectrum.total_weight();
    if total == 0.0 {
        return Err(Error::Division("spectrum has zero total weight".into()));
    }
    let mut weighted = 0.0;
    let mut err_sq = 0.0;
    for (i, j, w) in spectrum.filled_bins() {
        let r = lookup(spectrum.x().center(i), spectrum.y().center(j), table);
        weighted += w * r.value;
        err_sq += (w * r.error).powi(2);
    }
    Ok(EfficiencyResult::new(weighted / total, err_sq.sqrt() / total))
}

/// Product of the per-track efficiencies. Correlations between tracks are
/// ignored.
pub fn tracking_efficiency<'a, I>(spectra: I, table: &ReferenceTable) -> Result<EfficiencyResult>
where
    I: IntoIterator<Item = &'a Spectrum>,
{
    spectra
        .into_iter()
        .map(|s| total_efficiency(s, table))
        .product()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lcyield_core::types::ColumnData;
    use lcyield_io::{Codec, MemoryStorage, RecordFileWriter};

    use super::*;

    fn table() -> ReferenceTable {
        ReferenceTable::new(
            vec![0.0, 10.0, 20.0],
            vec![2.0, 3.0, 4.5],
            vec![0.9, 0.8, 1.1, 1.0],
            vec![0.01, 0.02, 0.03, 0.04],
        )
        .unwrap()
    }

    fn track_store(p_mev: Vec<f64>, eta: Vec<f64>) -> EventStore {
        let storage = MemoryStorage::new();
        let mut w = RecordFileWriter::new(Codec::None);
        w.add_column("h1_P", ColumnData::F64(p_mev.clone())).unwrap();
        w.add_column("h1_ETA", ColumnData::F64(eta.clone())).unwrap();
        w.add_column("h2_P", ColumnData::F64(p_mev.iter().map(|p| p * 2.0).collect()))
            .unwrap();
        w.add_column("h2_ETA", ColumnData::F64(eta)).unwrap();
        w.write(&storage, "tracks.rec").unwrap();
        let mut store = EventStore::new("tracks", Arc::new(storage));
        store.add("tracks.rec").unwrap();
        store
    }

    #[test]
    fn lookup_clamps_to_edge_bins() {
        let t = table();
        let at_center = lookup(5.0, 2.5, &t);
        assert_eq!(lookup(-100.0, 2.5, &t), at_center);
        assert_eq!(lookup(5.0, 0.0, &t), at_center);
        assert_eq!(lookup(1e6, 1e6, &t), lookup(15.0, 3.75, &t));
    }

    #[test]
    fn weighted_mean_and_error() {
        let t = table();
        let mut s = Spectrum::for_table(&t);
        s.fill(5.0, 2.5, 3.0);
        s.fill(15.0, 4.0, 1.0);
        let e = total_efficiency(&s, &t).unwrap();
        assert!((e.value - (3.0 * 0.9 + 1.0 * 1.0) / 4.0).abs() < 1e-12);
        let err = ((3.0f64 * 0.01).powi(2) + (1.0f64 * 0.04).powi(2)).sqrt() / 4.0;
        assert!((e.error - err).abs() < 1e-12);
    }

    #[test]
    fn empty_spectrum_is_a_division_error() {
        let t = table();
        let s = Spectrum::for_table(&t);
        assert!(matches!(total_efficiency(&s, &t), Err(Error::Division(_))));
    }

    #[test]
    fn foreign_binning_is_rejected() {
        let other = ReferenceTable::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0], vec![0.0]).unwrap();
        let mut s = Spectrum::for_table(&other);
        s.fill(0.5, 0.5, 1.0);
        assert!(matches!(
            total_efficiency(&s, &table()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn spectra_from_store_scale_momentum() {
        let t = table();
        let mut store = track_store(vec![5e3, 15e3, 8e3], vec![2.5, 4.0, 2.2]);
        let spectra = build_spectra(&mut store, &["h1", "h2"], &t, 1e-3).unwrap();
        assert_eq!(spectra[0].0, "h1");
        let h1 = &spectra[0].1;
        assert_eq!(h1.weight(0, 0), 2.0);
        assert_eq!(h1.weight(1, 1), 1.0);
        // h2 momenta are doubled: 10, 30 (overflow), 16 GeV
        let h2 = &spectra[1].1;
        assert_eq!(h2.weight(1, 0), 2.0);
        assert_eq!(h2.weight(1, 1), 1.0);

        let single = build_spectrum(&mut store, ("h1_P", "h1_ETA"), &t, 1e-3).unwrap();
        assert_eq!(&single, h1);
    }

    #[test]
    fn tracking_is_product_of_tracks() {
        let t = table();
        let mut a = Spectrum::for_table(&t);
        a.fill(5.0, 2.5, 1.0);
        let mut b = Spectrum::for_table(&t);
        b.fill(15.0, 2.5, 1.0);
        let e = tracking_efficiency([&a, &b], &t).unwrap();
        assert!((e.value - 0.9 * 1.1).abs() < 1e-12);
    }
}
