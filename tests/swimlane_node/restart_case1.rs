//! Rules written before a restart are served right after the warm-up scan.

use std::sync::Arc;

use swimlane::MessageSender;
use swimlane::NamespaceTagService;
use swimlane::NodeBuilder;
use swimlane::NotificationConfig;
use swimlane::Result;
use swimlane::SledStore;
use swimlane::StorageEngine;
use tokio::sync::watch;

use crate::common::enable_logger;
use crate::common::node_config;
use crate::common::publish_release;
use crate::common::seed_root_namespace;
use crate::common::start_node;
use crate::common::stop_node;
use crate::common::APP;
use crate::common::CLUSTER;
use crate::common::NAMESPACE;
use crate::common::OPERATOR;

struct DiscardSender;

impl MessageSender for DiscardSender {
    fn send_message(
        &self,
        _message: &str,
        _channel: &str,
    ) -> Result<()> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sled_node_serves_rules_after_restart() {
    enable_logger();
    let dir = tempfile::tempdir().unwrap();

    let release_id = {
        let store = Arc::new(SledStore::open_at(dir.path()).unwrap());
        seed_root_namespace(store.as_ref()).unwrap();

        let service = NamespaceTagService::new(store.clone(), Arc::new(DiscardSender), &NotificationConfig::default());
        let branch = service
            .create_tag_branch(APP, CLUSTER, NAMESPACE, "canary", OPERATOR)
            .unwrap();
        let release_id = publish_release(store.as_ref(), &branch.cluster_name).unwrap();
        service
            .update_branch_rule_on_new_release(APP, CLUSTER, NAMESPACE, &branch.cluster_name, release_id, OPERATOR)
            .unwrap();

        store.engine().flush().unwrap();
        release_id
    };

    let mut config = node_config();
    config.storage.db_root_dir = dir.path().to_path_buf();
    config.cache.scan_enabled = false;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let builder = NodeBuilder::<SledStore>::init(config, shutdown_rx)
        .with_sled_store()
        .unwrap();
    let (node, handle) = start_node(builder).await;

    assert_eq!(
        node.rules()
            .resolve(APP, "swimlane-canary", APP, CLUSTER, NAMESPACE),
        Some(release_id)
    );

    stop_node(shutdown_tx, handle).await;
}
