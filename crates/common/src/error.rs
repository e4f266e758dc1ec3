use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Challenge sent along with every 401.
pub const BASIC_AUTH_CHALLENGE: &str = r#"Basic realm="private""#;

/// Common error types used across the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("handler for sender {0:?} is already registered")]
    DuplicateSender(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("unsupported SNS type {0:?}")]
    UnsupportedEnvelope(String),

    #[error("Remediation error: {0}")]
    Remediation(String),

    #[error("Confirmation error: {0}")]
    Confirmation(String),
}

impl AppError {
    /// HTTP status this error maps to when it reaches a handler boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Decode(_) | AppError::UnsupportedEnvelope(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Io(_)
            | AppError::Config(_)
            | AppError::DuplicateSender(_)
            | AppError::Remediation(_)
            | AppError::Confirmation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error detail is never echoed to the caller; the body is the status text only.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = status.canonical_reason().unwrap_or_default();
        let mut response = (status, body).into_response();

        if let AppError::Auth(_) = self {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_AUTH_CHALLENGE),
            );
        }

        response
    }
}
