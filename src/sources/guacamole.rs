//! Thin client over the two Guacamole REST calls the relay needs:
//! the login (`POST api/tokens`) and an authenticated `GET api/{endpoint}`.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::TimeDelta;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::credential::Credential;
use crate::config::settings::GuacamoleConfig;
use crate::errors::AuthError;
use crate::helpers::time::Clock;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::{API_PREFIX, TOKENS_PATH, TOKEN_HEADER};

static SUCCESS_MSG: &str = "success";
static ERROR_MSG: &str = "error";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "authToken")]
    auth_token: String,
    #[serde(rename = "dataSource")]
    data_source: Option<String>,
    #[serde(rename = "availableDataSources", default)]
    available_data_sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GuacamoleClient {
    http: Client,
    config: GuacamoleConfig,
    token_lifetime: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl GuacamoleClient {
    pub fn new(config: GuacamoleConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let token_lifetime = TimeDelta::from_std(config.token_lifetime)
            .map_err(|e| anyhow!("token lifetime out of range: {}", e))?;

        Ok(Self {
            http,
            config,
            token_lifetime,
            clock,
        })
    }

    pub fn config(&self) -> &GuacamoleConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.url,
            API_PREFIX,
            endpoint.trim_start_matches('/')
        )
    }

    /// Log in with the configured service account.
    ///
    /// The returned credential expires `token_lifetime` after the response
    /// was received. Nothing is stored here; installing the credential is the
    /// cache's job.
    pub async fn authenticate(&self) -> Result<Credential, AuthError> {
        let metrics = get_metrics().await;
        let result = self.request_token().await;
        match &result {
            Ok(credential) => {
                metrics.auth_requests.with_label_values(&[SUCCESS_MSG]).inc();
                info!(
                    "logged into Guacamole as '{}', token valid until {}",
                    self.config.username, credential.expires_at
                );
            }
            Err(e) => {
                metrics.auth_requests.with_label_values(&[ERROR_MSG]).inc();
                warn!("Guacamole login as '{}' failed: {}", self.config.username, e);
            }
        }
        result
    }

    async fn request_token(&self) -> Result<Credential, AuthError> {
        let url = format!("{}/{}", self.config.url, TOKENS_PATH);
        debug!("requesting token from {}", url);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.expose_secret()),
            ])
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Transport)?;
        if !status.is_success() {
            return Err(AuthError::from_status(status, &body));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        if parsed.auth_token.trim().is_empty() {
            return Err(AuthError::MalformedResponse("empty authToken".to_owned()));
        }
        self.check_datasource(&parsed);

        Ok(Credential::new(
            parsed.auth_token,
            self.clock.now(),
            self.token_lifetime,
        ))
    }

    fn check_datasource(&self, parsed: &TokenResponse) {
        if parsed.available_data_sources.is_empty() {
            return;
        }
        if !parsed.available_data_sources.contains(&self.config.datasource) {
            warn!(
                "configured datasource '{}' is not offered by Guacamole (available: {:?}, primary: {:?})",
                self.config.datasource, parsed.available_data_sources, parsed.data_source
            );
        }
    }

    /// Single authenticated GET, no status handling.
    pub async fn get(&self, endpoint: &str, token: &SecretString) -> Result<Response, reqwest::Error> {
        self.http
            .get(self.api_url(endpoint))
            .header(TOKEN_HEADER, token.expose_secret())
            .send()
            .await
    }
}
