//! In-memory storage for tests and benchmarks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Thread-safe in-memory storage using a HashMap.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|_| Error::Storage("memory storage lock poisoned".into()))
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.lock()?.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let data = self.lock()?;
        let bytes = data
            .get(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        let start = offset as usize;
        let end = start.saturating_add(len);
        if end > bytes.len() {
            return Err(Error::Storage(format!(
                "{path}: range {start}..{end} exceeds size {}",
                bytes.len()
            )));
        }
        Ok(bytes[start..end].to_vec())
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.lock()?.remove(path);
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(path))
    }

    fn size(&self, path: &str) -> Result<u64> {
        let data = self.lock()?;
        let bytes = data
            .get(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        Ok(bytes.len() as u64)
    }

}
