//! Scoped filtered copies.
//!
//! A [`ScopedStore`] owns a store over a temporary record file. Dropping it
//! deletes the file through the store's storage and removes the scratch
//! directory, on every exit path including unwinding.

use std::path::Path;
use std::sync::Arc;

use lcyield_io::Storage;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::store::EventStore;

pub(crate) struct ScratchFile {
    storage: Arc<dyn Storage>,
    path: String,
    _dir: TempDir,
}

impl ScratchFile {
    pub(crate) fn create(storage: Arc<dyn Storage>, parent: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Scratch(format!("create {}: {e}", parent.display())))?;
        let dir = tempfile::Builder::new()
            .prefix("lcyield-")
            .tempdir_in(parent)
            .map_err(|e| Error::Scratch(format!("tempdir in {}: {e}", parent.display())))?;
        let path = dir
            .path()
            .join(format!("{name}_selected.rec"))
            .to_string_lossy()
            .into_owned();
        Ok(Self {
            storage,
            path,
            _dir: dir,
        })
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match self.storage.delete(&self.path) {
            Ok(()) => debug!(path = %self.path, "removed scratch file"),
            Err(e) => warn!(path = %self.path, error = %e, "failed to remove scratch file"),
        }
    }
}

/// An [`EventStore`] backed by a temporary file that lives as long as this value.
pub struct ScopedStore {
    // dropped before the scratch file it reads from
    store: EventStore,
    scratch: ScratchFile,
}

impl ScopedStore {
    pub(crate) fn new(store: EventStore, scratch: ScratchFile) -> Self {
        Self { store, scratch }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EventStore {
        &mut self.store
    }

    pub fn path(&self) -> &str {
        self.scratch.path()
    }

    pub fn entries(&self) -> u64 {
        self.store.entries()
    }
}

impl std::fmt::Debug for ScopedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStore")
            .field("path", &self.scratch.path)
            .field("store", &self.store)
            .finish()
    }
}
