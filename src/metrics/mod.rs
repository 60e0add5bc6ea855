use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    pub static ref SCAN_PASS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("tag_rule_scan_pass", "Periodic scan passes by result"),
        &["result"]
    )
    .expect("metric can not be created");

    pub static ref RULE_MERGE_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("tag_rule_merge", "Rule rows merged into the cache by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref RELEASE_MESSAGE_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("release_message", "Release messages handled by result"),
        &["result"]
    )
    .expect("metric can not be created");

    pub static ref INDEX_SIZE_METRIC: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tag_rule_index_size", "Entries held by each cache index"),
        &["index"]
    )
    .expect("metric can not be created");

    pub static ref LOAD_VERSION_METRIC: IntGauge =
        IntGauge::new("tag_rule_load_version", "Current cache load version")
            .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

pub(crate) fn register_custom_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(SCAN_PASS_METRIC.clone()),
            Box::new(RULE_MERGE_METRIC.clone()),
            Box::new(RELEASE_MESSAGE_METRIC.clone()),
            Box::new(INDEX_SIZE_METRIC.clone()),
            Box::new(LOAD_VERSION_METRIC.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                error!("collector can not be registered: {:?}", e);
            }
        }
    });
}

pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics();

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!("Prometheus exporter listening on port {}", port);
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(render_metrics())
}

/// Text exposition of the custom registry followed by the default one
pub(crate) fn render_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("could not encode prometheus metrics: {}", e);
    };

    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
