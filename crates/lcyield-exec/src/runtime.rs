//! Runtime: opens datasets by key and owns what every workflow shares.
//!
//! - Stores are opened through one [`Storage`] so tests can run on memory.
//! - Combined polarity chains the MagUp then the MagDown file.
//! - Derived meta files live under the configured output directory.
//! - Data-driven yields go through one [`MassFitter`], the sideband count
//!   unless another is configured.

use std::path::Path;
use std::sync::Arc;

use lcyield_core::config::AnalysisConfig;
use lcyield_core::keys::{DatasetKey, DecayMode, McType, Polarity, Year};
use lcyield_io::{FsStorage, Storage};
use lcyield_meta::{attach_meta, MassFitter, MetaBuilder, MetaOutcome, SidebandFitter};
use lcyield_selection::SelectionConfig;
use lcyield_stats::ReferenceTable;
use lcyield_store::EventStore;
use tracing::{debug, info};

use crate::error::Result;
use crate::layout::DataLayout;

/// File name of the tracking efficiency table under the data directory.
pub const TRACKING_TABLE_FILE: &str = "tracking_table.json";

/// Default number of smearing toys.
pub const DEFAULT_TOYS: u64 = 100;

pub struct Analysis {
    cfg: AnalysisConfig,
    storage: Arc<dyn Storage>,
    layout: DataLayout,
    tracking_table: Option<ReferenceTable>,
    toys: u64,
    fitter: Arc<dyn MassFitter>,
}

impl Analysis {
    pub fn new(cfg: AnalysisConfig) -> Self {
        Self::with_storage(cfg, Arc::new(FsStorage::new()))
    }

    pub fn with_storage(cfg: AnalysisConfig, storage: Arc<dyn Storage>) -> Self {
        let layout = DataLayout::new(cfg.data_dir.clone());
        Self {
            cfg,
            storage,
            layout,
            tracking_table: None,
            toys: DEFAULT_TOYS,
            fitter: Arc::new(SidebandFitter::default()),
        }
    }

    /// Fitter for the data-driven yields.
    pub fn with_fitter(mut self, fitter: Arc<dyn MassFitter>) -> Self {
        self.fitter = fitter;
        self
    }

    pub fn with_tracking_table(mut self, table: ReferenceTable) -> Self {
        self.tracking_table = Some(table);
        self
    }

    pub fn with_toys(mut self, toys: u64) -> Self {
        self.toys = toys;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.cfg
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn toys(&self) -> u64 {
        self.toys
    }

    pub fn fitter(&self) -> &dyn MassFitter {
        self.fitter.as_ref()
    }

    /// Key with the configured stripping campaign.
    pub fn key(&self, mode: DecayMode, polarity: Polarity, year: Year, mc: bool) -> DatasetKey {
        DatasetKey::new(mode, polarity, year, self.cfg.legacy_2011, mc)
    }

    pub fn selection(&self, key: &DatasetKey) -> SelectionConfig {
        SelectionConfig::for_key(key, &self.cfg)
    }

    /// Chain the files of `key`; fails with `NotFound` if any is missing.
    pub fn open(&self, key: &DatasetKey, sample: McType) -> Result<EventStore> {
        let name = if key.mc {
            format!("{key}-{sample}")
        } else {
            key.to_string()
        };
        let mut store = EventStore::new(name, self.storage.clone())
            .with_scratch_dir(self.cfg.scratch_dir.clone())
            .with_progress(self.cfg.show_progress);
        for path in self.layout.files(key, sample)? {
            store.add(&path)?;
        }
        store.validate()?;
        debug!(store = store.name(), entries = store.entries(), "opened");
        Ok(store)
    }

    /// [`open`](Self::open), attaching the meta friend of `key` when it has
    /// been built. Returns whether it was attached.
    pub fn open_with_meta(&self, key: &DatasetKey, sample: McType) -> Result<(EventStore, bool)> {
        let mut store = self.open(key, sample)?;
        let attached = attach_meta(&mut store, &self.cfg.output_dir, key)?;
        Ok((store, attached))
    }

    /// Build (or reuse) the meta friend of `key` from the stripped sample.
    pub fn build_meta(
        &self,
        key: &DatasetKey,
        fitter: &dyn MassFitter,
        force: bool,
    ) -> Result<MetaOutcome> {
        let mut store = self.open(key, McType::Stripped)?;
        let outcome = MetaBuilder::new(fitter, self.cfg.output_dir.clone(), self.selection(key))
            .with_seed(self.cfg.seed)
            .force(force)
            .ensure(&mut store, key)?;
        info!(%key, path = outcome.path(), "meta columns ready");
        Ok(outcome)
    }

    /// The configured tracking table, else the one under the data directory.
    pub fn tracking_table(&self) -> Result<ReferenceTable> {
        if let Some(t) = &self.tracking_table {
            return Ok(t.clone());
        }
        Ok(ReferenceTable::load(&self.cfg.data_dir.join(TRACKING_TABLE_FILE))?)
    }

    pub fn load_tracking_table(self, path: &Path) -> Result<Self> {
        let table = ReferenceTable::load(path)?;
        Ok(self.with_tracking_table(table))
    }
}

impl std::fmt::Debug for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analysis")
            .field("cfg", &self.cfg)
            .field("layout", &self.layout)
            .field("toys", &self.toys)
            .finish_non_exhaustive()
    }
}
