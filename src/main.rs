use std::path::Path;

use swimlane::utils::file_io::open_file_for_append;
use swimlane::Error;
use swimlane::MemoryStore;
use swimlane::NodeBuilder;
use swimlane::Result;
use swimlane::SledStore;
use swimlane::Store;
use swimlane::StorageEngineKind;
use swimlane::SwimlaneConfig;
use swimlane::SystemError;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = SwimlaneConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&config.storage.log_dir)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    info!("Application started. Waiting for CTRL+C signal...");
    // Listen on Shutdown Signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    let result = match config.storage.engine {
        StorageEngineKind::Sled => {
            let builder = NodeBuilder::<SledStore>::init(config, graceful_rx.clone()).with_sled_store()?;
            start_node(builder, graceful_rx).await
        }
        StorageEngineKind::Memory => {
            let builder = NodeBuilder::<MemoryStore>::init(config, graceful_rx.clone()).with_memory_store();
            start_node(builder, graceful_rx).await
        }
    };
    if let Err(e) = result {
        error!("node stops: {:?}", e);
    }

    println!("Exiting program.");
    Ok(())
}

async fn start_node<S: Store>(
    builder: NodeBuilder<S>,
    graceful_rx: watch::Receiver<()>,
) -> Result<()> {
    let node = builder
        .build()?
        .start_metrics_server(graceful_rx)
        .ready()?;

    node.run().await
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(signal_error)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(signal_error)?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    info!("Shutdown server..");
    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        SystemError::SignalSenderClosed(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown completed");
    Ok(())
}

fn signal_error(e: std::io::Error) -> Error {
    SystemError::NodeStartFailed(format!("failed to install signal handler: {}", e)).into()
}

pub fn init_observability(log_dir: &Path) -> Result<WorkerGuard> {
    let log_file = open_file_for_append(&log_dir.join("swimlane.log"))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
