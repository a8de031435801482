use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use guac_relay::config::loader::{self, Args};
use guac_relay::helpers::time::SystemClock;
use guac_relay::observability::metrics::get_metrics;
use guac_relay::resilience::retry::RetrySettings;
use guac_relay::server;
use guac_relay::server::server::AppState;
use guac_relay::sources::fetch::AuthenticatedFetcher;
use guac_relay::sources::guacamole::GuacamoleClient;
use guac_relay::utils::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read env (.env file first, then process env / flags)
    // -------------------------------

    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // -------------------------------
    // 2. Build config, start logging
    // -------------------------------

    let service_config = loader::run(args)?;
    logging::init_logging(&service_config.logging);
    info!(
        "relaying Guacamole at {} (datasource '{}') as '{}'",
        service_config.guacamole.url,
        service_config.guacamole.datasource,
        service_config.guacamole.username
    );

    // -------------------------------
    // 3. Create Guacamole client and token cache
    // -------------------------------

    let client = GuacamoleClient::new(service_config.guacamole.clone(), Arc::new(SystemClock))?;
    let fetcher = AuthenticatedFetcher::new(Arc::new(client));

    // -------------------------------
    // 4. Log in once at startup
    //
    // failure keeps the process alive, /health answers 503 until a login succeeds
    // -------------------------------

    let retry = RetrySettings::from(&service_config.startup_retry);
    let cache = fetcher.cache().clone();
    let startup_login = retry
        .run_with_retry(|| {
            let cache = cache.clone();
            async move { cache.authenticate_now().await }
        })
        .await;
    if let Err(e) = startup_login {
        error!("startup login to Guacamole failed, service not ready: {}", e);
    }

    // -------------------------------
    // 5. Start http server
    // -------------------------------

    let metrics = get_metrics().await;
    let state = AppState::new(fetcher, metrics);
    info!("Service starting...");
    server::server::start(&service_config.server, &service_config.metrics, state).await
}
