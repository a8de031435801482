use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Authentication
    pub auth_requests: IntCounterVec,
    pub token_rejections: IntCounter,
    pub token_expiry_unix: IntGauge,

    // Upstream reads
    pub upstream_requests: IntCounterVec,
    pub upstream_duration: HistogramVec,

    // Runtime
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("guacrelay".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            auth_requests: IntCounterVec::new(Opts::new("auth_requests_total", "Guacamole login attempts by outcome"),&["outcome"],).unwrap(),
            token_rejections: IntCounter::new("token_rejections_total", "Authenticated requests rejected with 403").unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Estimated expiry of the cached token").unwrap(),

            upstream_requests: IntCounterVec::new(Opts::new("upstream_requests_total","Authenticated GET requests by endpoint and status",),&["endpoint", "status"],).unwrap(),
            upstream_duration: HistogramVec::new(HistogramOpts::new("upstream_request_duration_seconds", "Upstream GET duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),&["endpoint"],).unwrap(),

            up: IntGauge::new("up", "1 if the last Guacamole login succeeded").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.auth_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_rejections.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_requests.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_duration.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
