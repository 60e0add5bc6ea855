use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::storage::decode_row;
use crate::storage::table_prefix;
use crate::Cluster;
use crate::KvStore;
use crate::Namespace;
use crate::Release;
use crate::Result;
use crate::Row;
use crate::StorageEngine;
use crate::Store;
use crate::TagReleaseRule;

pub(crate) const TEST_APP: &str = "A";
pub(crate) const TEST_CLUSTER: &str = "C";
pub(crate) const TEST_NAMESPACE: &str = "N";
pub(crate) const TEST_OPERATOR: &str = "apollo";

static LOGGER_INIT: Once = Once::new();

/// This will ensure the subscriber is only initialized once.
pub fn enable_logger() {
    LOGGER_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Seeds the root cluster `cluster` with namespace `namespace` for `app_id`.
pub(crate) fn seed_root_namespace<S: Store>(
    store: &S,
    app_id: &str,
    cluster: &str,
    namespace: &str,
) -> Result<Cluster> {
    store.transaction(|txn| {
        let root = txn.insert_cluster(Cluster::new_root(app_id, cluster, TEST_OPERATOR))?;
        txn.insert_namespace(Namespace::new(app_id, cluster, namespace, TEST_OPERATOR))?;
        Ok(root)
    })
}

/// Inserts `rules` in order and returns them with their assigned ids.
pub(crate) fn insert_rules<S: Store>(
    store: &S,
    rules: Vec<TagReleaseRule>,
) -> Result<Vec<TagReleaseRule>> {
    store.transaction(|txn| {
        let mut inserted = Vec::with_capacity(rules.len());
        for rule in rules {
            inserted.push(txn.insert_rule(rule)?);
        }
        Ok(inserted)
    })
}

pub(crate) fn publish_release<S: Store>(
    store: &S,
    app_id: &str,
    cluster: &str,
    namespace: &str,
) -> Result<Release> {
    store.transaction(|txn| {
        txn.insert_release(Release::new(
            app_id,
            cluster,
            namespace,
            "test-release",
            TEST_OPERATOR,
        ))
    })
}

/// Every row of `R`'s table, soft-deleted ones included, ascending by id.
pub(crate) fn load_table<R, E>(store: &KvStore<E>) -> Vec<R>
where
    R: Row,
    E: StorageEngine,
{
    let prefix = table_prefix(R::TABLE);
    let mut rows = Vec::new();
    store
        .engine()
        .scan_from(&prefix, &prefix, &mut |_key, value| {
            rows.push(decode_row(value)?);
            Ok(true)
        })
        .expect("table scan failed");
    rows
}
