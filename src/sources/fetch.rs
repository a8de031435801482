//! Authenticated reads against the Guacamole REST API.
//!
//! Credential state per fetch:
//!   ABSENT --login ok--> VALID --expired / 403--> ABSENT
//! A 403 triggers exactly one re-login and one retried GET. Any other
//! non-success status, and a second 403, fail the fetch.

use std::sync::Arc;

use reqwest::{Response, StatusCode};
use secrecy::SecretString;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::credential_cache::CredentialCache;
use crate::config::settings::GuacamoleConfig;
use crate::errors::FetchError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::sources::guacamole::GuacamoleClient;

static ERROR_MSG: &str = "error";

#[derive(Debug, Clone)]
pub struct AuthenticatedFetcher {
    client: Arc<GuacamoleClient>,
    cache: Arc<CredentialCache>,
}

impl AuthenticatedFetcher {
    pub fn new(client: Arc<GuacamoleClient>) -> Self {
        let cache = Arc::new(CredentialCache::new(client.clone()));
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<CredentialCache> {
        &self.cache
    }

    pub fn config(&self) -> &GuacamoleConfig {
        self.client.config()
    }

    /// GET `{base}/api/{endpoint}` and return the JSON body.
    pub async fn fetch(&self, endpoint: &str) -> Result<Value, FetchError> {
        let token = self.cache.get_valid_token().await?;
        let mut response = self.send(endpoint, &token).await?;

        if response.status() == StatusCode::FORBIDDEN {
            get_metrics().await.token_rejections.inc();
            warn!("'{}' answered 403, re-authenticating once", endpoint);
            let token = self.cache.refresh_after_rejection(&token).await?;
            response = self.send(endpoint, &token).await?;
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint.to_owned(),
                source,
            })?;
        if !status.is_success() {
            return Err(FetchError::from_status(endpoint, status, &body));
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            endpoint: endpoint.to_owned(),
            reason: e.to_string(),
        })
    }

    async fn send(&self, endpoint: &str, token: &SecretString) -> Result<Response, FetchError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        let result = self.client.get(endpoint, token).await;
        metrics
            .upstream_duration
            .with_label_values(&[endpoint])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                debug!("GET '{}' -> {}", endpoint, response.status());
                metrics
                    .upstream_requests
                    .with_label_values(&[endpoint, response.status().as_str()])
                    .inc();
                Ok(response)
            }
            Err(source) => {
                metrics
                    .upstream_requests
                    .with_label_values(&[endpoint, ERROR_MSG])
                    .inc();
                Err(FetchError::Transport {
                    endpoint: endpoint.to_owned(),
                    source,
                })
            }
        }
    }
}
