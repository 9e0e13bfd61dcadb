use std::fmt;

use lcyield_core::keys::{Polarity, Stripping, Year};
use lcyield_store::EventStore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::runtime::Analysis;

pub const LUMI_COLUMN: &str = "IntegratedLuminosity";
pub const LUMI_ERROR_COLUMN: &str = "IntegratedLuminosityErr";

/// Integrated luminosity in inverse picobarns. Per-row errors add linearly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Luminosity {
    pub value: f64,
    pub error: f64,
}

impl fmt::Display for Luminosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} +/- {:.3} /pb", self.value, self.error)
    }
}

impl Analysis {
    /// Sum of the luminosity table of `year` over the physical polarities of
    /// `polarity`.
    pub fn luminosity(&self, polarity: Polarity, year: Year) -> Result<Luminosity> {
        let stripping = Stripping::for_year(year, self.config().legacy_2011);
        let mut store = EventStore::new(format!("lumi-{year}-{polarity}"), self.storage().clone())
            .with_progress(self.config().show_progress);
        for &p in polarity.components() {
            store.add(&self.layout().lumi_file(year, stripping, p))?;
        }
        store.validate()?;
        store.activate_columns([LUMI_COLUMN, LUMI_ERROR_COLUMN], false)?;
        let value = store.value_ref(LUMI_COLUMN)?;
        let error = store.value_ref(LUMI_ERROR_COLUMN)?;

        let mut lumi = Luminosity {
            value: 0.0,
            error: 0.0,
        };
        for entry in store.iterate() {
            entry?;
            lumi.value += value.f64();
            lumi.error += error.f64();
        }
        info!(%year, %polarity, %lumi, "integrated luminosity");
        Ok(lumi)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lcyield_core::config::AnalysisConfig;
    use lcyield_core::types::ColumnData;
    use lcyield_io::{Codec, MemoryStorage, RecordFileWriter};

    use super::*;
    use crate::error::ExecError;

    fn write_lumi(storage: &MemoryStorage, path: &str, values: Vec<f64>, errors: Vec<f64>) {
        let mut w = RecordFileWriter::new(Codec::None);
        w.add_column(LUMI_COLUMN, ColumnData::F64(values)).unwrap();
        w.add_column(LUMI_ERROR_COLUMN, ColumnData::F64(errors)).unwrap();
        w.write(storage, path).unwrap();
    }

    fn analysis() -> (Arc<MemoryStorage>, Analysis) {
        let storage = Arc::new(MemoryStorage::new());
        let cfg = AnalysisConfig {
            data_dir: "data".into(),
            ..AnalysisConfig::default()
        };
        (storage.clone(), Analysis::with_storage(cfg, storage))
    }

    #[test]
    fn sums_values_and_errors() {
        let (storage, a) = analysis();
        let up = a.layout().lumi_file(Year::Y2011, Stripping::S20r1, Polarity::MagUp);
        let down = a.layout().lumi_file(Year::Y2011, Stripping::S20r1, Polarity::MagDown);
        write_lumi(&storage, &up, vec![100.0, 150.0], vec![3.0, 4.0]);
        write_lumi(&storage, &down, vec![200.0], vec![5.0]);

        let l = a.luminosity(Polarity::MagUp, Year::Y2011).unwrap();
        assert_eq!(l, Luminosity { value: 250.0, error: 7.0 });
        let l = a.luminosity(Polarity::Combined, Year::Y2011).unwrap();
        assert_eq!(l, Luminosity { value: 450.0, error: 12.0 });
    }

    #[test]
    fn missing_table_is_not_found() {
        let (_, a) = analysis();
        let err = a.luminosity(Polarity::MagDown, Year::Y2012).unwrap_err();
        assert!(matches!(err, ExecError::Store(lcyield_store::Error::NotFound(_))));
    }
}
