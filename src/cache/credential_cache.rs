use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::credential::{Credential, CredentialState};
use crate::errors::AuthError;
use crate::observability::metrics::get_metrics;
use crate::sources::guacamole::GuacamoleClient;

/// Holds at most one Guacamole session token for the configured account.
///
/// Refresh is lazy: expiry is only checked when a token is asked for.
/// `refresh_guard` serializes the check-then-login sequence so concurrent
/// callers racing past an expired token share one login round trip.
#[derive(Debug)]
pub struct CredentialCache {
    client: Arc<GuacamoleClient>,
    inner: RwLock<Option<Credential>>,
    refresh_guard: Mutex<()>,
    /// outcome of the last login attempt
    ready: AtomicBool,
}

impl CredentialCache {
    pub fn new(client: Arc<GuacamoleClient>) -> Self {
        Self {
            client,
            inner: RwLock::new(None),
            refresh_guard: Mutex::new(()),
            ready: AtomicBool::new(false),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.client.clock().now()
    }

    /// Stored token if it has not reached its expiry yet
    async fn current(&self) -> Option<SecretString> {
        let now = self.now();
        self.inner
            .read()
            .await
            .as_ref()
            .filter(|credential| credential.is_valid_at(now))
            .map(|credential| credential.token.clone())
    }

    /// Return a usable token, logging in first when none is stored or the
    /// stored one is expired.
    pub async fn get_valid_token(&self) -> Result<SecretString, AuthError> {
        if let Some(token) = self.current().await {
            return Ok(token);
        }

        let _guard = self.refresh_guard.lock().await;
        // a concurrent caller may have refreshed while we waited
        if let Some(token) = self.current().await {
            return Ok(token);
        }
        debug!("no valid Guacamole token cached, authenticating");
        self.login().await
    }

    /// Drop a token the upstream rejected and log in again.
    ///
    /// If another caller already replaced the rejected token with a valid one,
    /// that token is returned without a new login.
    pub async fn refresh_after_rejection(
        &self,
        rejected: &SecretString,
    ) -> Result<SecretString, AuthError> {
        let _guard = self.refresh_guard.lock().await;
        {
            let mut inner = self.inner.write().await;
            if inner.as_ref().is_some_and(|c| c.token.expose_secret() == rejected.expose_secret()) {
                info!("Guacamole rejected the cached token, discarding it");
                *inner = None;
            }
        }
        if let Some(token) = self.current().await {
            return Ok(token);
        }
        self.login().await
    }

    /// Unconditional login, replacing whatever is stored.
    pub async fn authenticate_now(&self) -> Result<SecretString, AuthError> {
        let _guard = self.refresh_guard.lock().await;
        self.login().await
    }

    /// Caller must hold `refresh_guard`.
    async fn login(&self) -> Result<SecretString, AuthError> {
        let metrics = get_metrics().await;
        match self.client.authenticate().await {
            Ok(credential) => {
                let token = credential.token.clone();
                metrics.token_expiry_unix.set(credential.expires_at.timestamp());
                metrics.up.set(1);
                *self.inner.write().await = Some(credential);
                self.ready.store(true, Ordering::SeqCst);
                Ok(token)
            }
            Err(e) => {
                // the store keeps whatever it had, a failed login never installs anything
                metrics.up.set(0);
                self.ready.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    pub async fn state(&self) -> CredentialState {
        CredentialState::of(self.inner.read().await.as_ref(), self.now())
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.as_ref().map(|c| c.expires_at)
    }

    /// True when the most recent login attempt succeeded.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
