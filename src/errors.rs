use reqwest::StatusCode;
use thiserror::Error;

/// Maximum length for upstream bodies embedded in error messages
const MAX_ERROR_BODY_LENGTH: usize = 300;

/// Failure to obtain a session token from Guacamole.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("authentication request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("authentication rejected with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed authentication response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        AuthError::Status {
            status,
            body: truncate_body(body),
        }
    }

    /// HTTP status of the login response, when the upstream answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AuthError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AuthError::Transport(e) if e.is_timeout())
    }
}

/// Failure of an authenticated read against the Guacamole REST API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request to '{endpoint}' failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to '{endpoint}' returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("response of '{endpoint}' is not valid JSON: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("unexpected payload shape: {0}")]
    UnexpectedPayload(String),
}

impl FetchError {
    pub fn from_status(endpoint: &str, status: StatusCode, body: &str) -> Self {
        FetchError::Status {
            endpoint: endpoint.to_owned(),
            status,
            body: truncate_body(body),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Auth(e) => e.status(),
            _ => None,
        }
    }
}

/// Truncate a response body so error messages stay readable
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_owned();
    }
    let mut cut = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
}
