use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::TokenError;
use crate::domain::errors::DomainError;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::email::MailError;
use crate::infrastructure::payments::PaymentError;

pub const LOGIN_REQUIRED: &str = "Access denied! Please log in";
pub const SESSION_EXPIRED: &str = "Session expired! Please log in again";
pub const GENERIC_ERROR: &str = "Something went wrong!";

/// API error type with HTTP status code and message
///
/// Operational errors are expected failures whose message is safe to show
/// to clients. Everything else is a bug or an infrastructure failure and
/// is masked in production by the error middleware.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub operational: bool,
    /// Internal cause, only ever shown in development
    pub detail: Option<String>,
}

/// Marks a response as produced by an [`ApiError`] so the error middleware
/// can re-render it for the client
#[derive(Debug, Clone)]
pub struct ErrorReport(pub ApiError);

impl ApiError {
    /// Creates a new operational API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            operational: true,
            detail: None,
        }
    }

    /// Creates a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 401 Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Creates a 403 Forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Creates a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// A 500 whose message is intended for the client
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Creates a non-operational 500 Internal Server Error
    pub fn internal_server_error(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: detail.clone(),
            operational: false,
            detail: Some(detail),
        }
    }

    /// `fail` for client errors, `error` for server errors
    pub fn status_label(&self) -> &'static str {
        if self.status.is_client_error() {
            "fail"
        } else {
            "error"
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "status": self.status_label(),
            "message": self.message
        }));

        let mut response = (self.status, body).into_response();
        response.extensions_mut().insert(ErrorReport(self));
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Duplicate(_) | RepositoryError::InvalidValue { .. } => {
                Self::bad_request(error.to_string())
            }
            RepositoryError::MissingReference(_) => Self::not_found(error.to_string()),
            RepositoryError::Database(_) => Self::internal_server_error(error.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Expired => Self::unauthorized(SESSION_EXPIRED),
            TokenError::Invalid(_) => Self::unauthorized(LOGIN_REQUIRED),
            TokenError::Signing(_) => Self::internal_server_error(error.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(error: bcrypt::BcryptError) -> Self {
        Self::internal_server_error(format!("Failed to hash password: {}", error))
    }
}

impl From<MailError> for ApiError {
    fn from(error: MailError) -> Self {
        Self::internal_server_error(error.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(error: PaymentError) -> Self {
        Self::internal_server_error(error.to_string())
    }
}

impl From<askama::Error> for ApiError {
    fn from(error: askama::Error) -> Self {
        Self::internal_server_error(format!("Failed to render template: {}", error))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal_server_error(format!("Failed to serialize response: {}", error))
    }
}
