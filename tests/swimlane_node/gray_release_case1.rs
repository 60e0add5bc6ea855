//! Full tag branch life cycle against a running node: create, release,
//! resolve, retire.

use std::sync::Arc;

use swimlane::BranchStatus;
use swimlane::Error;
use swimlane::LifecycleError;
use swimlane::MemoryStore;
use tokio::sync::watch;

use crate::common::enable_logger;
use crate::common::publish_release;
use crate::common::seed_root_namespace;
use crate::common::start_memory_node;
use crate::common::stop_node;
use crate::common::wait_until;
use crate::common::APP;
use crate::common::CLUSTER;
use crate::common::NAMESPACE;
use crate::common::OPERATOR;

const CLIENT_APP: &str = "checkout-web";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tag_branch_life_cycle() {
    enable_logger();
    let store = Arc::new(MemoryStore::in_memory());
    seed_root_namespace(store.as_ref()).unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let (node, handle) = start_memory_node(store.clone(), shutdown_rx).await;
    let service = node.tag_service();
    let rules = node.rules();

    // 1. Branch exists but was never released: nothing to serve
    let branch = service
        .create_tag_branch(APP, CLUSTER, NAMESPACE, "gray", OPERATOR)
        .unwrap();
    node.notify_release(APP, CLUSTER, NAMESPACE).unwrap();
    assert!(rules
        .resolve(CLIENT_APP, "swimlane-gray", APP, CLUSTER, NAMESPACE)
        .is_none());

    let again = service.create_tag_branch(APP, CLUSTER, NAMESPACE, "swimlane-gray", OPERATOR);
    assert!(matches!(
        again,
        Err(Error::Lifecycle(LifecycleError::Conflict { .. }))
    ));

    // 2. Release the branch and announce it
    let release_id = publish_release(store.as_ref(), &branch.cluster_name).unwrap();
    let rule = service
        .update_branch_rule_on_new_release(APP, CLUSTER, NAMESPACE, &branch.cluster_name, release_id, OPERATOR)
        .unwrap()
        .unwrap();
    assert_eq!(rule.release_id, release_id);
    node.notify_release(APP, CLUSTER, NAMESPACE).unwrap();

    wait_until(|| rules.resolve(APP, "swimlane-gray", APP, CLUSTER, NAMESPACE) == Some(release_id)).await;
    assert!(rules.has_tag_rule(APP, "swimlane-gray", NAMESPACE));
    assert!(rules
        .resolve(APP, "swimlane-blue", APP, CLUSTER, NAMESPACE)
        .is_none());

    let found = service
        .find_tag_branch(APP, CLUSTER, NAMESPACE, "gray")
        .unwrap()
        .unwrap();
    assert_eq!(found.cluster_name, branch.cluster_name);
    let branches = service.find_tag_branches(APP, CLUSTER, NAMESPACE).unwrap();
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0].tag, "swimlane-gray");

    // 3. Retire it; the node publishes on its own
    service
        .delete_tag_branch(APP, CLUSTER, NAMESPACE, &branch.cluster_name, BranchStatus::Merged, OPERATOR)
        .unwrap();
    wait_until(|| {
        rules
            .resolve(APP, "swimlane-gray", APP, CLUSTER, NAMESPACE)
            .is_none()
    })
    .await;
    assert!(!rules.has_tag_rule(APP, "swimlane-gray", NAMESPACE));

    let latest = service
        .find_branch_tag_rule(APP, CLUSTER, NAMESPACE, &branch.cluster_name)
        .unwrap()
        .unwrap();
    assert_eq!(latest.branch_status, BranchStatus::Merged);
    assert!(service
        .find_tag_branch(APP, CLUSTER, NAMESPACE, "gray")
        .unwrap()
        .is_none());

    // Deleting again is a no-op
    service
        .delete_tag_branch(APP, CLUSTER, NAMESPACE, &branch.cluster_name, BranchStatus::Deleted, OPERATOR)
        .unwrap();

    stop_node(shutdown_tx, handle).await;
}
