use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::settings::{MetricsConfig, ServerConfig};
use crate::observability::metrics::Metrics;
use crate::observability::routes::MetricsState;
use crate::server::routes;
use crate::sources::fetch::AuthenticatedFetcher;

#[derive(Clone)]
pub struct AppState {
    pub fetcher: AuthenticatedFetcher,
    pub metrics_state: MetricsState,
}

impl AppState {
    pub fn new(fetcher: AuthenticatedFetcher, metrics: &Metrics) -> Self {
        Self {
            fetcher,
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }
}

/// Relay routes, open CORS for the browser frontend.
pub fn router(state: AppState, metrics_config: &MetricsConfig) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/users", get(routes::list_users))
        .route("/connections", get(routes::list_connections))
        .route("/connections/summary", get(routes::list_connection_summaries))
        .merge(state.metrics_state.router(metrics_config))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the relay until ctrl-c / SIGTERM.
pub async fn start(
    server_config: &ServerConfig,
    metrics_config: &MetricsConfig,
    state: AppState,
) -> Result<()> {
    let app = router(state, metrics_config);

    let bind_addr = server_config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
