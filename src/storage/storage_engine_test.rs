use std::sync::Arc;

use crate::test_utils::insert_rules;
use crate::test_utils::seed_root_namespace;
use crate::test_utils::RuleBuilder;
use crate::test_utils::TEST_APP;
use crate::test_utils::TEST_CLUSTER;
use crate::test_utils::TEST_NAMESPACE;
use crate::test_utils::TEST_OPERATOR;
use crate::BranchStatus;
use crate::Cluster;
use crate::Error;
use crate::KvStore;
use crate::LifecycleError;
use crate::Namespace;
use crate::Release;
use crate::Result;
use crate::RuleStore;
use crate::StorageEngine;
use crate::StorageError;
use crate::Store;
use crate::SystemError;

/// Test suite for StorageEngine implementations
///
/// Every engine is exercised through [`KvStore`], so the suite checks the
/// row semantics the cache and the lifecycle service depend on: id order,
/// soft-delete filtering, pagination and transaction atomicity.
pub(crate) struct StorageEngineTestSuite;

/// Builder trait for creating StorageEngine instances for testing
pub(crate) trait StorageEngineBuilder {
    type Engine: StorageEngine;

    /// Create a new, empty StorageEngine instance
    fn build(&self) -> Result<Arc<Self::Engine>>;

    /// Clean up any resources after testing
    fn cleanup(&self) -> Result<()>;
}

impl StorageEngineTestSuite {
    pub(crate) fn run_all_tests<B: StorageEngineBuilder>(builder: B) -> Result<()> {
        Self::test_empty_store(KvStore::new(builder.build()?))?;
        Self::test_ids_strictly_increasing(KvStore::new(builder.build()?))?;
        Self::test_pagination(KvStore::new(builder.build()?))?;
        Self::test_soft_deleted_rows_hidden(KvStore::new(builder.build()?))?;
        Self::test_transaction_rollback(KvStore::new(builder.build()?))?;
        Self::test_staged_writes_visible_in_transaction(KvStore::new(builder.build()?))?;
        Self::test_natural_key_matches_either_cluster(KvStore::new(builder.build()?))?;
        Self::test_delete_cluster_cascades(KvStore::new(builder.build()?))?;
        Self::test_latest_release(KvStore::new(builder.build()?))?;
        Self::test_active_rule_by_tag(KvStore::new(builder.build()?))?;
        Self::test_delete_missing_rule(KvStore::new(builder.build()?))?;
        Self::test_flush(builder.build()?)?;

        builder.cleanup()?;
        Ok(())
    }

    fn test_empty_store<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        assert!(store.find_rules_page(0, 500)?.is_empty());
        assert!(store
            .find_rules_by_natural_key(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE)?
            .is_empty());
        Ok(())
    }

    fn test_ids_strictly_increasing<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        let rules = insert_rules(
            &store,
            vec![
                RuleBuilder::new("b1").build(),
                RuleBuilder::new("b2").build(),
            ],
        )?;
        let more = insert_rules(&store, vec![RuleBuilder::new("b3").build()])?;

        assert!(rules[0].id > 0);
        assert!(rules[1].id > rules[0].id);
        assert!(more[0].id > rules[1].id);
        Ok(())
    }

    fn test_pagination<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        let rules: Vec<_> = (1..=7)
            .map(|i| RuleBuilder::new(&format!("branch-{}", i)).build())
            .collect();
        let inserted = insert_rules(&store, rules)?;

        let first = store.find_rules_page(0, 3)?;
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].id, inserted[0].id);
        assert_eq!(first[2].id, inserted[2].id);

        let second = store.find_rules_page(first[2].id, 3)?;
        assert_eq!(second.len(), 3);
        assert_eq!(second[0].id, inserted[3].id);

        let last = store.find_rules_page(second[2].id, 3)?;
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, inserted[6].id);

        assert!(store.find_rules_page(last[0].id, 3)?.is_empty());
        assert!(store.find_rules_page(u64::MAX, 3)?.is_empty());
        Ok(())
    }

    fn test_soft_deleted_rows_hidden<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        let inserted = insert_rules(
            &store,
            vec![
                RuleBuilder::new("b1").build(),
                RuleBuilder::new("b2").build(),
                RuleBuilder::new("b3").build(),
            ],
        )?;
        store.transaction(|txn| txn.delete_rule(inserted[1].id, TEST_OPERATOR))?;

        // Deleted rows do not count toward the page limit
        let page = store.find_rules_page(0, 2)?;
        assert_eq!(
            page.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![inserted[0].id, inserted[2].id]
        );

        let by_key = store.find_rules_by_natural_key(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE)?;
        assert_eq!(by_key.len(), 2);
        assert!(by_key.iter().all(|r| r.id != inserted[1].id));

        // Deleting twice reports the row as gone
        let again = store.transaction(|txn| txn.delete_rule(inserted[1].id, TEST_OPERATOR));
        assert!(again.is_err());
        Ok(())
    }

    fn test_transaction_rollback<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        let result: Result<()> = store.transaction(|txn| {
            txn.insert_cluster(Cluster::new_root(TEST_APP, TEST_CLUSTER, TEST_OPERATOR))?;
            txn.insert_rule(RuleBuilder::new("b1").build())?;
            Err(LifecycleError::NotFound("abort".to_string()).into())
        });
        assert!(result.is_err());

        assert!(store.find_rules_page(0, 500)?.is_empty());
        let cluster = store.transaction(|txn| txn.find_cluster(TEST_APP, TEST_CLUSTER))?;
        assert!(cluster.is_none());
        Ok(())
    }

    fn test_staged_writes_visible_in_transaction<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        store.transaction(|txn| {
            let root = txn.insert_cluster(Cluster::new_root(TEST_APP, TEST_CLUSTER, TEST_OPERATOR))?;
            let found = txn.find_cluster(TEST_APP, TEST_CLUSTER)?;
            assert_eq!(found.map(|c| c.id), Some(root.id));

            let rule = txn.insert_rule(RuleBuilder::new("b1").build())?;
            txn.delete_rule(rule.id, TEST_OPERATOR)?;
            assert!(txn
                .find_rules_by_natural_key(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE)?
                .is_empty());
            Ok(())
        })
    }

    fn test_natural_key_matches_either_cluster<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        let inserted = insert_rules(
            &store,
            vec![
                RuleBuilder::new("branch-1").build(),
                RuleBuilder::new("branch-2").namespace("other").build(),
            ],
        )?;

        let by_parent = store.find_rules_by_natural_key(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE)?;
        assert_eq!(by_parent.len(), 1);
        assert_eq!(by_parent[0].id, inserted[0].id);

        let by_branch = store.find_rules_by_natural_key(TEST_APP, "branch-1", TEST_NAMESPACE)?;
        assert_eq!(by_branch.len(), 1);

        assert!(store
            .find_rules_by_natural_key("B", TEST_CLUSTER, TEST_NAMESPACE)?
            .is_empty());
        Ok(())
    }

    fn test_delete_cluster_cascades<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        let root = seed_root_namespace(&store, TEST_APP, TEST_CLUSTER, TEST_NAMESPACE)?;

        let branch = store.transaction(|txn| {
            let branch = txn.insert_cluster(Cluster::new_branch(&root, "branch-1", TEST_OPERATOR))?;
            txn.insert_namespace(Namespace::new(TEST_APP, "branch-1", TEST_NAMESPACE, TEST_OPERATOR))?;
            Ok(branch)
        })?;

        let children = store.transaction(|txn| txn.find_child_namespaces(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE))?;
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].cluster_name, "branch-1");

        store.transaction(|txn| txn.delete_cluster(branch.id, TEST_OPERATOR))?;

        store.transaction(|txn| {
            assert!(txn.find_cluster(TEST_APP, "branch-1")?.is_none());
            assert!(txn.find_namespace(TEST_APP, "branch-1", TEST_NAMESPACE)?.is_none());
            assert!(txn.find_namespace(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE)?.is_some());
            assert!(txn
                .find_child_namespaces(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE)?
                .is_empty());
            Ok(())
        })
    }

    fn test_latest_release<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        let latest = store.transaction(|txn| {
            txn.insert_release(Release::new(TEST_APP, "branch-1", TEST_NAMESPACE, "r1", TEST_OPERATOR))?;
            let r2 = txn.insert_release(Release::new(TEST_APP, "branch-1", TEST_NAMESPACE, "r2", TEST_OPERATOR))?;
            let mut abandoned = Release::new(TEST_APP, "branch-1", TEST_NAMESPACE, "r3", TEST_OPERATOR);
            abandoned.is_abandoned = true;
            txn.insert_release(abandoned)?;
            Ok(r2)
        })?;

        let found = store.transaction(|txn| txn.find_latest_active_release(TEST_APP, "branch-1", TEST_NAMESPACE))?;
        assert_eq!(found.map(|r| r.id), Some(latest.id));

        let none = store.transaction(|txn| txn.find_latest_active_release(TEST_APP, "branch-2", TEST_NAMESPACE))?;
        assert!(none.is_none());
        Ok(())
    }

    fn test_active_rule_by_tag<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        insert_rules(
            &store,
            vec![
                RuleBuilder::new("branch-1")
                    .tag("gamma")
                    .status(BranchStatus::Deleted)
                    .build(),
                RuleBuilder::new("branch-2").tag("beta").build(),
            ],
        )?;

        store.transaction(|txn| {
            let beta = txn.find_active_rule_by_tag(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE, "swimlane-beta")?;
            assert_eq!(beta.map(|r| r.branch_name), Some("branch-2".to_string()));

            let gamma = txn.find_active_rule_by_tag(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE, "swimlane-gamma")?;
            assert!(gamma.is_none());

            let latest = txn.find_latest_branch_rule(TEST_APP, TEST_CLUSTER, TEST_NAMESPACE, "branch-1")?;
            assert_eq!(latest.map(|r| r.branch_status), Some(BranchStatus::Deleted));
            Ok(())
        })
    }

    fn test_delete_missing_rule<E: StorageEngine>(store: KvStore<E>) -> Result<()> {
        let result = store.transaction(|txn| txn.delete_rule(42, TEST_OPERATOR));
        assert!(matches!(
            result,
            Err(Error::System(SystemError::Storage(StorageError::RowNotFound { id: 42, .. })))
        ));
        Ok(())
    }

    fn test_flush<E: StorageEngine>(engine: Arc<E>) -> Result<()> {
        let store = KvStore::new(engine.clone());
        insert_rules(&store, vec![RuleBuilder::new("b1").build()])?;
        engine.flush()?;
        assert_eq!(store.find_rules_page(0, 500)?.len(), 1);
        Ok(())
    }
}
