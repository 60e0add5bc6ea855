//! A running swimlane node.
//!
//! ## Key Responsibilities
//! - Owns the tag rule cache and the lifecycle service sharing one store
//! - Warms the cache with a full scan before reporting ready
//! - Keeps the periodic scanner alive until shutdown
//!
//! ## Example Usage
//! ```ignore
//! let node = NodeBuilder::init(config, shutdown_rx)
//!     .with_memory_store()
//!     .build()?
//!     .ready()?;
//! tokio::spawn(async move {
//!     node.run().await.expect("swimlane node execution failed");
//! });
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::run_scan_pass;
use crate::spawn_rule_scanner;
use crate::MessageSender;
use crate::NamespaceTagService;
use crate::ReleaseMessageBus;
use crate::ReleaseMessageKeyGenerator;
use crate::Result;
use crate::Store;
use crate::SwimlaneConfig;
use crate::TagReleaseRulesHolder;

pub struct Node<S>
where
    S: Store,
{
    pub(crate) rules: Arc<TagReleaseRulesHolder<S>>,
    pub(crate) tag_service: Arc<NamespaceTagService<S>>,
    pub(crate) release_bus: ReleaseMessageBus,
    pub(crate) ready: AtomicBool,
    pub(crate) shutdown_signal: watch::Receiver<()>,

    pub config: Arc<SwimlaneConfig>,
}

impl<S> Node<S>
where
    S: Store,
{
    /// Warms the cache, starts the scanner and serves until shutdown.
    pub async fn run(&self) -> Result<()> {
        // 1. Full synchronous pass so the cache is never cold once ready
        run_scan_pass(self.rules.clone(), self.shutdown_signal.clone()).await?;
        info!(
            "Tag release rules warmed up at load version {}",
            self.rules.load_version()
        );

        // 2. Fixed-delay reconciliation
        let scanner = if self.config.cache.scan_enabled {
            Some(spawn_rule_scanner(
                self.rules.clone(),
                self.config.cache.scan_interval(),
                self.shutdown_signal.clone(),
            ))
        } else {
            info!("Periodic tag rule scan disabled");
            None
        };

        // 3. Ready to serve resolution queries
        self.set_ready(true);

        let mut shutdown = self.shutdown_signal.clone();
        let _ = shutdown.changed().await;
        self.set_ready(false);
        info!("Swimlane node received shutdown signal");

        if let Some(scanner) = scanner {
            scanner.await?;
        }
        Ok(())
    }

    /// Read side consumed by the config-serving path
    pub fn rules(&self) -> Arc<TagReleaseRulesHolder<S>> {
        self.rules.clone()
    }

    /// Administrative side
    pub fn tag_service(&self) -> Arc<NamespaceTagService<S>> {
        self.tag_service.clone()
    }

    /// Announces a release of `app_id`/`cluster_name`/`namespace_name` on the
    /// in-process release topic.
    pub fn notify_release(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Result<()> {
        let message = ReleaseMessageKeyGenerator::new(self.config.notification.key_separator)
            .generate(app_id, cluster_name, namespace_name);
        self.release_bus
            .send_message(&message, &self.config.notification.release_topic)
    }

    pub fn set_ready(
        &self,
        is_ready: bool,
    ) {
        info!("Set node is_ready: {}", is_ready);
        self.ready.store(is_ready, Ordering::SeqCst);
    }

    pub fn server_is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
