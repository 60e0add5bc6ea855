//! A builder pattern implementation for constructing a [`Node`] instance.
//!
//! The [`NodeBuilder`] assembles the components a swimlane node needs: the
//! rule store, the in-process release message bus, the tag rule cache and
//! the tag branch lifecycle service.
//!
//! ## Key Design Points
//! - **Store selection**: `with_sled_store()` for the persistent store, `with_memory_store()` for
//!   process-local tables, or `store()` for a caller-supplied one.
//! - **Customization**: `message_sender()` replaces the bus as the lifecycle service's publisher.
//! - **Lifecycle Management**:
//!   - `build()`: Assembles the [`Node`] and spawns the release message dispatcher.
//!   - `start_metrics_server()`: Launches the Prometheus endpoint.
//!   - `ready()`: Finalizes construction and returns the initialized [`Node`].
//!
//! ## Example
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let node = NodeBuilder::init(config, shutdown_rx)
//!     .with_sled_store()?
//!     .build()?
//!     .start_metrics_server(shutdown_tx.subscribe())
//!     .ready()?;
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use tracing::info;

use crate::metrics;
use crate::MemoryStore;
use crate::MessageSender;
use crate::NamespaceTagService;
use crate::Node;
use crate::ReleaseMessageDispatcher;
use crate::Result;
use crate::SledStore;
use crate::Store;
use crate::SwimlaneConfig;
use crate::SystemError;
use crate::TagReleaseRulesHolder;

pub struct NodeBuilder<S>
where
    S: Store,
{
    pub(super) config: SwimlaneConfig,
    pub(super) store: Option<Arc<S>>,
    pub(super) message_sender: Option<Arc<dyn MessageSender>>,
    pub(super) shutdown_signal: watch::Receiver<()>,

    pub(super) node: Option<Arc<Node<S>>>,
}

impl<S> NodeBuilder<S>
where
    S: Store,
{
    /// Creates a builder from an already loaded configuration.
    pub fn init(
        config: SwimlaneConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            store: None,
            message_sender: None,
            shutdown_signal,
            node: None,
        }
    }

    /// Sets the rule store shared by the cache and the lifecycle service.
    pub fn store(
        mut self,
        store: Arc<S>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the release bus as the lifecycle service's publisher.
    ///
    /// Messages sent through a custom sender never reach this node's cache;
    /// the periodic scan picks the change up instead.
    pub fn message_sender(
        mut self,
        message_sender: Arc<dyn MessageSender>,
    ) -> Self {
        self.message_sender = Some(message_sender);
        self
    }

    /// Builds the node and spawns the release message dispatcher.
    ///
    /// # Errors
    /// Fails with `NodeStartFailed` when no store was configured.
    pub fn build(mut self) -> Result<Self> {
        let store = self
            .store
            .take()
            .ok_or_else(|| SystemError::NodeStartFailed("no rule store configured".to_string()))?;

        let (mut dispatcher, release_bus) = ReleaseMessageDispatcher::new(
            self.config.notification.channel_capacity,
            self.config.notification.max_in_flight_dispatches,
            self.shutdown_signal.clone(),
        );

        let rules = Arc::new(TagReleaseRulesHolder::new(
            store.clone(),
            &self.config.cache,
            &self.config.notification,
        ));
        dispatcher.add_listener(rules.clone());

        let message_sender = self
            .message_sender
            .take()
            .unwrap_or_else(|| Arc::new(release_bus.clone()) as Arc<dyn MessageSender>);
        let tag_service = Arc::new(NamespaceTagService::new(
            store,
            message_sender,
            &self.config.notification,
        ));

        debug!("1. --- spawn release message dispatcher --- ");
        tokio::spawn(dispatcher.run());

        self.node = Some(Arc::new(Node {
            rules,
            tag_service,
            release_bus,
            ready: AtomicBool::new(false),
            shutdown_signal: self.shutdown_signal.clone(),
            config: Arc::new(self.config.clone()),
        }));
        Ok(self)
    }

    /// Starts the metrics server for monitoring node operations.
    ///
    /// Launches a Prometheus endpoint on the configured port, unless
    /// monitoring is disabled.
    pub fn start_metrics_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if !self.config.monitoring.prometheus_enabled {
            info!("Prometheus exporter disabled");
            return self;
        }
        let port = self.config.monitoring.prometheus_port;
        tokio::spawn(async move {
            metrics::start_server(port, shutdown_signal).await;
        });
        self
    }

    /// Returns the built node instance after successful construction.
    ///
    /// # Errors
    /// Returns `NodeStartFailed` if build hasn't completed
    pub fn ready(self) -> Result<Arc<Node<S>>> {
        self.node
            .ok_or_else(|| SystemError::NodeStartFailed("check node ready failed".to_string()).into())
    }
}

impl NodeBuilder<SledStore> {
    /// Opens the persistent store under `storage.db_root_dir`.
    pub fn with_sled_store(self) -> Result<Self> {
        let store = SledStore::open_at(&self.config.storage.db_root_dir)?;
        Ok(self.store(Arc::new(store)))
    }
}

impl NodeBuilder<MemoryStore> {
    pub fn with_memory_store(self) -> Self {
        self.store(Arc::new(MemoryStore::in_memory()))
    }
}
