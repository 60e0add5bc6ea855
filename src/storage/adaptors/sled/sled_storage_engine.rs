use std::path::Path;
use std::sync::Arc;

use ::sled::Batch;
use ::sled::Db;
use ::sled::Tree;
use tracing::debug;
use tracing::trace;

use super::init_sled_config_db;
use crate::constants::CONFIG_DB_TREE;
use crate::KvStore;
use crate::Result;
use crate::StorageEngine;

/// Rule store backed by [`SledStorageEngine`]
pub type SledStore = KvStore<SledStorageEngine>;

/// Every table lives in one sled tree so a commit is a single atomic batch.
pub struct SledStorageEngine {
    db: Db,
    tree: Tree,
}

impl std::fmt::Debug for SledStorageEngine {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledStorageEngine")
            .field("tree_len", &self.tree.len())
            .finish()
    }
}

impl SledStorageEngine {
    pub fn new(db: Db) -> Result<Self> {
        let tree = db.open_tree(CONFIG_DB_TREE)?;
        Ok(Self { db, tree })
    }

    pub fn open(db_root_dir: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        Self::new(init_sled_config_db(db_root_dir)?)
    }
}

impl StorageEngine for SledStorageEngine {
    fn scan_from(
        &self,
        start: &[u8],
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<bool>,
    ) -> Result<()> {
        for item in self.tree.range(start..) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if !visit(&key, &value)? {
                break;
            }
        }
        Ok(())
    }

    fn get(
        &self,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|ivec| ivec.to_vec()))
    }

    fn apply_batch(
        &self,
        writes: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<()> {
        let mut batch = Batch::default();

        trace!("apply_batch len = {:?}", writes.len());

        for (key, value) in writes {
            batch.insert(key, value);
        }

        self.tree.apply_batch(batch)?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        // generate_id starts at 0; row ids must be positive
        Ok(self.db.generate_id()? + 1)
    }

    fn flush(&self) -> Result<()> {
        let bytes = self.tree.flush()?;
        debug!("Successfully flushed sled DB, bytes flushed: {}", bytes);
        Ok(())
    }
}

impl SledStore {
    /// Persistent rule store under `db_root_dir`
    pub fn open_at(db_root_dir: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        Ok(KvStore::new(Arc::new(SledStorageEngine::open(db_root_dir)?)))
    }
}
