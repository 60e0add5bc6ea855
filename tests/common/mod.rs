use std::sync::Arc;
use std::time::Duration;

use swimlane::Cluster;
use swimlane::MemoryStore;
use swimlane::Namespace;
use swimlane::Node;
use swimlane::NodeBuilder;
use swimlane::Release;
use swimlane::Result;
use swimlane::Store;
use swimlane::SwimlaneConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

pub const APP: &str = "order-service";
pub const CLUSTER: &str = "default";
pub const NAMESPACE: &str = "application";
pub const OPERATOR: &str = "apollo";

pub const WAIT_FOR_NODE_READY_IN_SEC: u64 = 3;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

pub fn node_config() -> SwimlaneConfig {
    let mut config = SwimlaneConfig::default();
    config.monitoring.prometheus_enabled = false;
    config
}

/// Root cluster `CLUSTER` of `APP` with namespace `NAMESPACE`
pub fn seed_root_namespace<S: Store>(store: &S) -> Result<()> {
    store.transaction(|txn| {
        txn.insert_cluster(Cluster::new_root(APP, CLUSTER, OPERATOR))?;
        txn.insert_namespace(Namespace::new(APP, CLUSTER, NAMESPACE, OPERATOR))?;
        Ok(())
    })
}

/// Publishes a release of `NAMESPACE` on `cluster_name` and returns its id.
pub fn publish_release<S: Store>(
    store: &S,
    cluster_name: &str,
) -> Result<u64> {
    store.transaction(|txn| {
        let release = txn.insert_release(Release::new(APP, cluster_name, NAMESPACE, "gray-release", OPERATOR))?;
        Ok(release.id)
    })
}

pub async fn start_node<S: Store>(
    builder: NodeBuilder<S>
) -> (Arc<Node<S>>, JoinHandle<Result<()>>) {
    let node = builder.build().unwrap().ready().unwrap();
    let runner = node.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    wait_until(|| node.server_is_ready()).await;
    (node, handle)
}

pub async fn start_memory_node(
    store: Arc<MemoryStore>,
    shutdown: watch::Receiver<()>,
) -> (Arc<Node<MemoryStore>>, JoinHandle<Result<()>>) {
    start_node(NodeBuilder::init(node_config(), shutdown).store(store)).await
}

pub async fn stop_node(
    shutdown_tx: watch::Sender<()>,
    handle: JoinHandle<Result<()>>,
) {
    shutdown_tx.send(()).unwrap();
    timeout(Duration::from_secs(WAIT_FOR_NODE_READY_IN_SEC), handle)
        .await
        .expect("node did not stop in time")
        .unwrap()
        .unwrap();
}

pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    timeout(Duration::from_secs(WAIT_FOR_NODE_READY_IN_SEC), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
