//! HTTP Basic authentication gate.
//!
//! Enforced only when both `BASIC_AUTH_USER` and `BASIC_AUTH_PASS` are set.
//! With either one empty every request passes through unchecked.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use bounce_common::error::AppError;

use crate::routes::health::HEALTH_PATH;
use crate::state::AppState;

/// Username/password pair carried in an `Authorization: Basic` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub pass: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

impl BasicCredentials {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// Parse the `Authorization` header, if it holds Basic credentials.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, pass) = decoded.split_once(':')?;
        Some(Self::new(user, pass))
    }

    /// Value for an `Authorization` header carrying these credentials.
    pub fn header_value(&self) -> String {
        format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", self.user, self.pass))
        )
    }
}

/// Axum middleware rejecting requests without the configured credentials.
///
/// Health checks (`GET`/`HEAD` on [`HEALTH_PATH`]) pass unchecked; every
/// other method on that path is a notification and is gated like the rest.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.basic_auth_enabled() || is_health_check(&request) {
        return Ok(next.run(request).await);
    }

    let expected = BasicCredentials::new(
        state.config.basic_auth_user.as_str(),
        state.config.basic_auth_pass.as_str(),
    );

    match BasicCredentials::from_headers(request.headers()) {
        Some(provided) if provided == expected => Ok(next.run(request).await),
        Some(provided) => {
            tracing::warn!(user = %provided.user, "Invalid Basic credentials");
            Err(AppError::Auth("invalid credentials".to_string()))
        }
        None => {
            tracing::warn!("Missing or malformed Authorization header");
            Err(AppError::Auth("missing credentials".to_string()))
        }
    }
}

fn is_health_check(request: &Request) -> bool {
    matches!(*request.method(), Method::GET | Method::HEAD) && request.uri().path() == HEALTH_PATH
}
