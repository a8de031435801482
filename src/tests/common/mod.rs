// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde_json::Value;

use secrecy::SecretString;

use crate::config::settings::GuacamoleConfig;
use crate::helpers::time::Clock;
use crate::sources::fetch::AuthenticatedFetcher;
use crate::sources::guacamole::GuacamoleClient;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn guacamole_config(url: String) -> GuacamoleConfig {
    GuacamoleConfig {
        url,
        username: "relay".to_owned(),
        password: SecretString::from("s3cret".to_owned()),
        datasource: "postgresql".to_owned(),
        token_lifetime: Duration::from_secs(55 * 60),
        request_timeout: Duration::from_secs(5),
    }
}

pub fn build_fetcher(config: GuacamoleConfig, clock: Arc<dyn Clock>) -> AuthenticatedFetcher {
    let client = GuacamoleClient::new(config, clock).expect("guacamole client");
    AuthenticatedFetcher::new(Arc::new(client))
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(start) })
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// In-process stand-in for the Guacamole REST API, mounted under `/guacamole`.
///
/// Issues tokens on `POST /guacamole/api/tokens` and answers
/// `GET /guacamole/api/{*endpoint}` with canned bodies, 403 for unknown or
/// revoked tokens. Every call is recorded in `events`.
#[derive(Clone, Default)]
pub struct FakeGuacamole {
    state: Arc<FakeState>,
}

#[derive(Default)]
struct FakeState {
    logins: AtomicUsize,
    reads: AtomicUsize,
    next_tokens: Mutex<VecDeque<String>>,
    valid_tokens: Mutex<HashSet<String>>,
    login_status: Mutex<Option<StatusCode>>,
    login_delay: Mutex<Option<Duration>>,
    read_statuses: Mutex<VecDeque<StatusCode>>,
    bodies: Mutex<HashMap<String, Value>>,
    credentials_seen: Mutex<Vec<(String, String)>>,
    events: Mutex<Vec<String>>,
}

impl FakeGuacamole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the fake and return it together with the base url to configure.
    pub async fn spawn(&self) -> (JoinHandle<()>, String) {
        let router = Router::new()
            .route("/guacamole/api/tokens", post(login))
            .route("/guacamole/api/{*endpoint}", get(read))
            .with_state(self.clone());
        let (handle, addr) = spawn_axum(router).await;
        (handle, format!("http://{}/guacamole", addr))
    }

    pub fn issue_next(&self, token: &str) {
        self.state.next_tokens.lock().unwrap().push_back(token.to_owned());
    }

    pub fn fail_logins_with(&self, status: StatusCode) {
        *self.state.login_status.lock().unwrap() = Some(status);
    }

    pub fn delay_logins(&self, delay: Duration) {
        *self.state.login_delay.lock().unwrap() = Some(delay);
    }

    /// Statuses returned by the next GETs regardless of token
    pub fn script_reads(&self, statuses: &[StatusCode]) {
        self.state.read_statuses.lock().unwrap().extend(statuses.iter().copied());
    }

    /// Server-side expiry of every token issued so far
    pub fn revoke_all(&self) {
        self.state.valid_tokens.lock().unwrap().clear();
    }

    pub fn serve(&self, endpoint: &str, body: Value) {
        self.state.bodies.lock().unwrap().insert(endpoint.to_owned(), body);
    }

    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }

    pub fn credentials_seen(&self) -> Vec<(String, String)> {
        self.state.credentials_seen.lock().unwrap().clone()
    }

    /// `login:<token>` / `read:<token>:<status>` in arrival order
    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().unwrap().clone()
    }
}

async fn login(
    State(fake): State<FakeGuacamole>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let state = &fake.state;
    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    state.credentials_seen.lock().unwrap().push((
        form.get("username").cloned().unwrap_or_default(),
        form.get("password").cloned().unwrap_or_default(),
    ));

    let delay = *state.login_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let failure = *state.login_status.lock().unwrap();
    if let Some(status) = failure {
        state.events.lock().unwrap().push(format!("login:{}", status.as_u16()));
        return (status, Json(json!({"message": "Permission Denied.", "type": "INVALID_CREDENTIALS"})))
            .into_response();
    }

    let token = state
        .next_tokens
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| format!("token-{}", n));
    state.valid_tokens.lock().unwrap().insert(token.clone());
    state.events.lock().unwrap().push(format!("login:{}", token));

    Json(json!({
        "authToken": token,
        "username": form.get("username"),
        "dataSource": "postgresql",
        "availableDataSources": ["postgresql", "postgresql-shared"]
    }))
    .into_response()
}

async fn read(
    State(fake): State<FakeGuacamole>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
) -> Response {
    let state = &fake.state;
    state.reads.fetch_add(1, Ordering::SeqCst);
    let token = headers
        .get("Guacamole-Token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let scripted = state.read_statuses.lock().unwrap().pop_front();
    let status = match scripted {
        Some(status) => status,
        None if state.valid_tokens.lock().unwrap().contains(&token) => StatusCode::OK,
        None => StatusCode::FORBIDDEN,
    };
    state
        .events
        .lock()
        .unwrap()
        .push(format!("read:{}:{}", token, status.as_u16()));

    if status != StatusCode::OK {
        return (status, Json(json!({"message": "Permission Denied.", "type": "PERMISSION_DENIED"})))
            .into_response();
    }

    let endpoint = endpoint.trim_start_matches('/');
    let body = state
        .bodies
        .lock()
        .unwrap()
        .get(endpoint)
        .cloned()
        .unwrap_or_else(|| json!({}));
    Json(body).into_response()
}
