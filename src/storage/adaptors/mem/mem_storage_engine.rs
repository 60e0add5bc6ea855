use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;
use tracing::trace;

use crate::KvStore;
use crate::Result;
use crate::StorageEngine;

/// Rule store backed by [`MemoryStorageEngine`]
pub type MemoryStore = KvStore<MemoryStorageEngine>;

/// In-memory ordered byte map
#[derive(Debug, Default)]
pub struct MemoryStorageEngine {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    last_id: AtomicU64,
}

impl MemoryStorageEngine {
    /// Creates new in-memory storage engine
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageEngine for MemoryStorageEngine {
    fn scan_from(
        &self,
        start: &[u8],
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<bool>,
    ) -> Result<()> {
        let data = self.data.read();
        for (key, value) in data.range(start.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if !visit(key, value)? {
                break;
            }
        }
        Ok(())
    }

    fn get(
        &self,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn apply_batch(
        &self,
        writes: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<()> {
        trace!("apply_batch len = {}", writes.len());
        let mut data = self.data.write();
        for (key, value) in writes {
            data.insert(key, value);
        }
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        Ok(self.last_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn flush(&self) -> Result<()> {
        trace!("MemoryStorageEngine flush (no-op)");
        Ok(())
    }
}

impl MemoryStore {
    /// Empty in-memory rule store
    pub fn in_memory() -> Self {
        KvStore::new(std::sync::Arc::new(MemoryStorageEngine::new()))
    }
}

#[cfg(test)]
impl MemoryStorageEngine {
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}
