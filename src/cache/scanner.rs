use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::TagReleaseRulesHolder;
use crate::Result;
use crate::RuleStore;

/// Runs one scan pass on the blocking pool and waits for it.
pub async fn run_scan_pass<S>(
    holder: Arc<TagReleaseRulesHolder<S>>,
    shutdown: watch::Receiver<()>,
) -> Result<()>
where
    S: RuleStore,
{
    tokio::task::spawn_blocking(move || holder.periodic_scan(&shutdown)).await?;
    Ok(())
}

/// Spawns the fixed-delay scanner: each pass starts `interval` after the
/// previous one finished.
pub fn spawn_rule_scanner<S>(
    holder: Arc<TagReleaseRulesHolder<S>>,
    interval: Duration,
    mut shutdown_signal: watch::Receiver<()>,
) -> JoinHandle<()>
where
    S: RuleStore,
{
    tokio::spawn(async move {
        info!("Tag release rule scanner started, interval {:?}", interval);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = run_scan_pass(holder.clone(), shutdown_signal.clone()).await {
                        error!("Tag release rule scan task failed: {:?}", e);
                    }
                }
                _ = shutdown_signal.changed() => {
                    info!("Tag release rule scanner received shutdown signal");
                    break;
                }
            }
        }

        debug!("Tag release rule scanner stopped");
    })
}
