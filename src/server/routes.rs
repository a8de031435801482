use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::errors::FetchError;
use crate::server::server::AppState;
use crate::sources::payload::{connection_summaries, connections_payload, users_payload};

/// Failure surfaced to the frontend as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match &e {
            FetchError::Auth(auth) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: format!("Failed to log in: {}", auth),
            },
            FetchError::UnexpectedPayload(_) => Self {
                status: StatusCode::BAD_GATEWAY,
                detail: format!("Guacamole returned {}", e),
            },
            _ => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: format!("Guacamole request failed: {}", e),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "backend up",
        "guacamole": state.fetcher.config().url,
    }))
}

/// Readiness: 200 only while the last Guacamole login succeeded.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let cache = state.fetcher.cache();
    let ready = cache.is_ready();
    let body = json!({
        "status": if ready { "ready" } else { "unavailable" },
        "credential": cache.state().await.as_str(),
        "token_expires_at": cache.expires_at().await.map(|t| t.to_rfc3339()),
    });
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let endpoint = state.fetcher.config().users_endpoint();
    let upstream = fetch_logged(&state, &endpoint).await?;
    Ok(Json(users_payload(upstream).map_err(log_failure(&endpoint))?))
}

pub async fn list_connections(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let endpoint = state.fetcher.config().connections_endpoint();
    let upstream = fetch_logged(&state, &endpoint).await?;
    Ok(Json(connections_payload(upstream)))
}

pub async fn list_connection_summaries(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let endpoint = state.fetcher.config().connections_endpoint();
    let upstream = fetch_logged(&state, &endpoint).await?;
    let summaries = connection_summaries(&upstream).map_err(log_failure(&endpoint))?;
    Ok(Json(json!({ "connections": summaries })))
}

async fn fetch_logged(state: &AppState, endpoint: &str) -> Result<Value, ApiError> {
    state
        .fetcher
        .fetch(endpoint)
        .await
        .map_err(|e| ApiError::from(log_failure(endpoint)(e)))
}

fn log_failure(endpoint: &str) -> impl Fn(FetchError) -> FetchError + '_ {
    move |e| {
        error!("fetching '{}' failed: {}", endpoint, e);
        e
    }
}
