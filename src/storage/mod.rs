//! Rule Store: the relational source of truth behind the tag rule cache.
//!
//! Tables live in an ordered byte map ([`StorageEngine`]) keyed by
//! `table/<big-endian id>`, so a prefix range scan yields rows in ascending id
//! order. Two engines are provided under `adaptors`: an in-memory map and a
//! persistent sled tree. [`KvStore`] layers the row queries, soft-delete
//! filtering and transactions on top of either one.
mod adaptors;
mod kv_store;
mod row;

pub use adaptors::*;
pub use kv_store::*;
pub use row::*;

#[cfg(test)]
mod storage_engine_test;

#[cfg(test)]
use mockall::automock;

use crate::Audit;
use crate::Cluster;
use crate::Namespace;
use crate::Release;
use crate::ReleaseHistory;
use crate::Result;
use crate::TagReleaseRule;

/// Read side consumed by the rule cache. Soft-deleted rows are never returned.
#[cfg_attr(test, automock)]
pub trait RuleStore: Send + Sync + 'static {
    /// All rules of `app_id`/`namespace_name` whose branch cluster or parent
    /// cluster is `cluster_name`, ascending by id.
    fn find_rules_by_natural_key(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Vec<TagReleaseRule>>;

    /// Up to `limit` rules with `id > after_id`, ascending by id.
    fn find_rules_page(
        &self,
        after_id: u64,
        limit: usize,
    ) -> Result<Vec<TagReleaseRule>>;
}

/// Write side consumed by the lifecycle service.
pub trait Store: RuleStore {
    /// Runs `f` as one atomic unit.
    ///
    /// Writes staged through the [`StoreTxn`] become visible to other readers
    /// only when `f` returns `Ok`; an `Err` discards all of them.
    /// Transactions are serialized against each other.
    fn transaction<T, F>(
        &self,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut dyn StoreTxn) -> Result<T>;
}

/// Per-transaction view of the tables. Reads observe committed rows plus the
/// transaction's own staged writes.
pub trait StoreTxn {
    fn find_cluster(
        &self,
        app_id: &str,
        name: &str,
    ) -> Result<Option<Cluster>>;

    fn insert_cluster(
        &mut self,
        cluster: Cluster,
    ) -> Result<Cluster>;

    /// Soft-deletes the cluster and every namespace under it.
    fn delete_cluster(
        &mut self,
        id: u64,
        operator: &str,
    ) -> Result<()>;

    fn find_namespace(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Option<Namespace>>;

    /// Namespaces named `namespace_name` living in branch clusters of
    /// `parent_cluster_name`.
    fn find_child_namespaces(
        &self,
        app_id: &str,
        parent_cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Vec<Namespace>>;

    fn insert_namespace(
        &mut self,
        namespace: Namespace,
    ) -> Result<Namespace>;

    fn find_latest_active_release(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Option<Release>>;

    fn insert_release(
        &mut self,
        release: Release,
    ) -> Result<Release>;

    /// ACTIVE rule binding `tag` under the parent cluster, if any.
    fn find_active_rule_by_tag(
        &self,
        app_id: &str,
        parent_cluster_name: &str,
        namespace_name: &str,
        tag: &str,
    ) -> Result<Option<TagReleaseRule>>;

    fn find_rules_by_natural_key(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Vec<TagReleaseRule>>;

    /// Highest-id rule of `branch_name`, matched against either cluster column.
    fn find_latest_branch_rule(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
        branch_name: &str,
    ) -> Result<Option<TagReleaseRule>>;

    /// Assigns the next id, which is larger than every id assigned before.
    fn insert_rule(
        &mut self,
        rule: TagReleaseRule,
    ) -> Result<TagReleaseRule>;

    /// Soft delete
    fn delete_rule(
        &mut self,
        id: u64,
        operator: &str,
    ) -> Result<()>;

    fn insert_release_history(
        &mut self,
        history: ReleaseHistory,
    ) -> Result<ReleaseHistory>;

    fn insert_audit(
        &mut self,
        audit: Audit,
    ) -> Result<Audit>;
}

/// Ordered byte map with atomic multi-key commit.
pub trait StorageEngine: Send + Sync + 'static {
    /// Visits entries with key `>= start` that share `prefix`, in key order,
    /// until `visit` returns `Ok(false)`.
    fn scan_from(
        &self,
        start: &[u8],
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<bool>,
    ) -> Result<()>;

    fn get(
        &self,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>>;

    /// Applies every write or none of them.
    fn apply_batch(
        &self,
        writes: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<()>;

    /// Strictly increasing, never 0
    fn next_id(&self) -> Result<u64>;

    fn flush(&self) -> Result<()>;
}
