use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::instrument;
use tracing::trace;

use super::decode_row;
use super::encode_row;
use super::row_index_id;
use super::row_index_key;
use super::row_index_prefix;
use super::row_key;
use super::table_prefix;
use super::Row;
use super::RuleStore;
use super::StorageEngine;
use super::Store;
use super::StoreTxn;
use crate::Audit;
use crate::Cluster;
use crate::Namespace;
use crate::Release;
use crate::ReleaseHistory;
use crate::Result;
use crate::StorageError;
use crate::TagReleaseRule;

/// Row-level store over any [`StorageEngine`].
pub struct KvStore<E>
where
    E: StorageEngine,
{
    engine: Arc<E>,
    // Serializes transactions so check-then-insert sequences are atomic
    write_lock: Mutex<()>,
}

impl<E> KvStore<E>
where
    E: StorageEngine,
{
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            write_lock: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> Arc<E> {
        self.engine.clone()
    }

    /// Live rows of `R`'s table with `id >= from_id`, stopping after `limit`.
    fn load_rows<R: Row>(
        &self,
        from_id: u64,
        limit: usize,
    ) -> Result<Vec<R>> {
        let prefix = table_prefix(R::TABLE);
        let start = row_key(R::TABLE, from_id);
        let mut rows = Vec::new();

        if limit == 0 {
            return Ok(rows);
        }

        self.engine.scan_from(&start, &prefix, &mut |_key, value| {
            let row: R = decode_row(value)?;
            if !row.is_deleted() {
                rows.push(row);
            }
            Ok(rows.len() < limit)
        })?;

        Ok(rows)
    }

    /// Live rows of `R` in the index slot `scope`, ascending by id.
    fn scoped_rows<R: Row>(
        &self,
        scope: &[&str],
    ) -> Result<Vec<R>> {
        let prefix = row_index_prefix(R::TABLE, scope);
        let mut ids = Vec::new();
        self.engine.scan_from(&prefix, &prefix, &mut |key, _| {
            ids.extend(row_index_id(key));
            Ok(true)
        })?;

        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bytes) = self.engine.get(&row_key(R::TABLE, id))? {
                let row: R = decode_row(&bytes)?;
                if !row.is_deleted() {
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }
}

impl<E> RuleStore for KvStore<E>
where
    E: StorageEngine,
{
    #[instrument(skip(self))]
    fn find_rules_by_natural_key(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Vec<TagReleaseRule>> {
        let rules = self.scoped_rows::<TagReleaseRule>(&[app_id, namespace_name])?;
        Ok(filter_natural_key(rules, app_id, cluster_name, namespace_name))
    }

    #[instrument(skip(self))]
    fn find_rules_page(
        &self,
        after_id: u64,
        limit: usize,
    ) -> Result<Vec<TagReleaseRule>> {
        let Some(from_id) = after_id.checked_add(1) else {
            return Ok(Vec::new());
        };
        let page = self.load_rows::<TagReleaseRule>(from_id, limit)?;
        trace!("find_rules_page after_id={} returned {} rows", after_id, page.len());
        Ok(page)
    }
}

impl<E> Store for KvStore<E>
where
    E: StorageEngine,
{
    fn transaction<T, F>(
        &self,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut dyn StoreTxn) -> Result<T>,
    {
        let _guard = self.write_lock.lock();

        let mut txn = KvTxn {
            engine: self.engine.as_ref(),
            staged: BTreeMap::new(),
        };

        let value = f(&mut txn)?;

        if txn.staged.is_empty() {
            return Ok(value);
        }

        let writes: Vec<(Vec<u8>, Vec<u8>)> = txn.staged.into_iter().collect();
        debug!("commit transaction with {} writes", writes.len());
        self.engine.apply_batch(writes)?;

        Ok(value)
    }
}

/// Staged writes of one transaction, keyed like the engine.
struct KvTxn<'a, E>
where
    E: StorageEngine,
{
    engine: &'a E,
    staged: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl<E> KvTxn<'_, E>
where
    E: StorageEngine,
{
    /// Live rows of `R` in the index slot `scope`, committed and staged,
    /// ascending by id.
    fn scoped_rows<R: Row>(
        &self,
        scope: &[&str],
    ) -> Result<Vec<R>> {
        let prefix = row_index_prefix(R::TABLE, scope);
        let mut ids = BTreeSet::new();

        self.engine.scan_from(&prefix, &prefix, &mut |key, _| {
            ids.extend(row_index_id(key));
            Ok(true)
        })?;

        for key in self.staged.range(prefix.clone()..).map(|(key, _)| key) {
            if !key.starts_with(&prefix) {
                break;
            }
            ids.extend(row_index_id(key));
        }

        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            rows.extend(self.row::<R>(id)?);
        }
        Ok(rows)
    }

    fn row<R: Row>(
        &self,
        id: u64,
    ) -> Result<Option<R>> {
        let key = row_key(R::TABLE, id);
        let bytes = match self.staged.get(&key) {
            Some(bytes) => Some(bytes.clone()),
            None => self.engine.get(&key)?,
        };

        match bytes {
            Some(bytes) => {
                let row: R = decode_row(&bytes)?;
                Ok((!row.is_deleted()).then_some(row))
            }
            None => Ok(None),
        }
    }

    fn insert<R: Row>(
        &mut self,
        mut row: R,
    ) -> Result<R> {
        row.set_id(self.engine.next_id()?);
        self.put(&row)?;
        if let Some(key) = row_index_key(&row) {
            self.staged.insert(key, Vec::new());
        }
        Ok(row)
    }

    fn put<R: Row>(
        &mut self,
        row: &R,
    ) -> Result<()> {
        self.staged.insert(row_key(R::TABLE, row.id()), encode_row(row)?);
        Ok(())
    }

    fn soft_delete<R: Row>(
        &mut self,
        id: u64,
        operator: &str,
    ) -> Result<R> {
        let mut row: R = self.row(id)?.ok_or(StorageError::RowNotFound {
            table: R::TABLE,
            id,
        })?;
        row.data_change_mut().mark_deleted(operator);
        self.put(&row)?;
        Ok(row)
    }
}

impl<E> StoreTxn for KvTxn<'_, E>
where
    E: StorageEngine,
{
    fn find_cluster(
        &self,
        app_id: &str,
        name: &str,
    ) -> Result<Option<Cluster>> {
        Ok(self
            .scoped_rows::<Cluster>(&[app_id])?
            .into_iter()
            .find(|c| c.name == name))
    }

    fn insert_cluster(
        &mut self,
        cluster: Cluster,
    ) -> Result<Cluster> {
        self.insert(cluster)
    }

    fn delete_cluster(
        &mut self,
        id: u64,
        operator: &str,
    ) -> Result<()> {
        let cluster: Cluster = self.soft_delete(id, operator)?;

        let namespaces: Vec<Namespace> = self
            .scoped_rows::<Namespace>(&[cluster.app_id.as_str()])?
            .into_iter()
            .filter(|n| n.cluster_name == cluster.name)
            .collect();
        for namespace in namespaces {
            self.soft_delete::<Namespace>(namespace.id, operator)?;
        }
        Ok(())
    }

    fn find_namespace(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Option<Namespace>> {
        Ok(self
            .scoped_rows::<Namespace>(&[app_id])?
            .into_iter()
            .find(|n| n.cluster_name == cluster_name && n.namespace_name == namespace_name))
    }

    fn find_child_namespaces(
        &self,
        app_id: &str,
        parent_cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Vec<Namespace>> {
        let Some(parent) = self.find_cluster(app_id, parent_cluster_name)? else {
            return Ok(Vec::new());
        };

        let branch_clusters: Vec<String> = self
            .scoped_rows::<Cluster>(&[app_id])?
            .into_iter()
            .filter(|c| c.parent_cluster_id == parent.id)
            .map(|c| c.name)
            .collect();

        Ok(self
            .scoped_rows::<Namespace>(&[app_id])?
            .into_iter()
            .filter(|n| n.namespace_name == namespace_name && branch_clusters.contains(&n.cluster_name))
            .collect())
    }

    fn insert_namespace(
        &mut self,
        namespace: Namespace,
    ) -> Result<Namespace> {
        self.insert(namespace)
    }

    fn find_latest_active_release(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Option<Release>> {
        Ok(self
            .scoped_rows::<Release>(&[app_id, cluster_name, namespace_name])?
            .into_iter()
            .rev()
            .find(|r| !r.is_abandoned))
    }

    fn insert_release(
        &mut self,
        release: Release,
    ) -> Result<Release> {
        self.insert(release)
    }

    fn find_active_rule_by_tag(
        &self,
        app_id: &str,
        parent_cluster_name: &str,
        namespace_name: &str,
        tag: &str,
    ) -> Result<Option<TagReleaseRule>> {
        Ok(self
            .scoped_rows::<TagReleaseRule>(&[app_id, namespace_name])?
            .into_iter()
            .rev()
            .find(|r| r.is_active() && r.parent_cluster_name == parent_cluster_name && r.tag == tag))
    }

    fn find_rules_by_natural_key(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Vec<TagReleaseRule>> {
        Ok(filter_natural_key(
            self.scoped_rows::<TagReleaseRule>(&[app_id, namespace_name])?,
            app_id,
            cluster_name,
            namespace_name,
        ))
    }

    fn find_latest_branch_rule(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
        branch_name: &str,
    ) -> Result<Option<TagReleaseRule>> {
        Ok(filter_natural_key(
            self.scoped_rows::<TagReleaseRule>(&[app_id, namespace_name])?,
            app_id,
            cluster_name,
            namespace_name,
        )
        .into_iter()
        .rev()
        .find(|r| r.branch_name == branch_name))
    }

    fn insert_rule(
        &mut self,
        rule: TagReleaseRule,
    ) -> Result<TagReleaseRule> {
        self.insert(rule)
    }

    fn delete_rule(
        &mut self,
        id: u64,
        operator: &str,
    ) -> Result<()> {
        self.soft_delete::<TagReleaseRule>(id, operator)?;
        Ok(())
    }

    fn insert_release_history(
        &mut self,
        history: ReleaseHistory,
    ) -> Result<ReleaseHistory> {
        self.insert(history)
    }

    fn insert_audit(
        &mut self,
        audit: Audit,
    ) -> Result<Audit> {
        self.insert(audit)
    }
}

fn filter_natural_key(
    rules: Vec<TagReleaseRule>,
    app_id: &str,
    cluster_name: &str,
    namespace_name: &str,
) -> Vec<TagReleaseRule> {
    rules
        .into_iter()
        .filter(|r| {
            r.app_id == app_id && r.namespace_name == namespace_name && r.in_cluster(cluster_name)
        })
        .collect()
}
