use crate::middleware::error_handling;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(AppError::status_code(self))
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        error_handling::into_response(self)
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Service error.
///
/// Variants carrying a public message render it verbatim in the response
/// body. `Database`, `Unexpected` and `Config` carry private
/// detail that is logged and replaced by a generic message.
#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Resource already exists.".into())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::BadRequest("Referenced record does not exist.".into())
            }
            _ => AppError::Database(e.to_string()),
        }
    }
}

impl From<crypto_core::PasswordError> for AppError {
    fn from(e: crypto_core::PasswordError) -> Self {
        AppError::Unexpected(e.to_string())
    }
}

impl From<crypto_core::JwtError> for AppError {
    fn from(e: crypto_core::JwtError) -> Self {
        AppError::Unexpected(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {field}."))
                })
            })
            .next()
            .unwrap_or_else(|| "Validation failed.".to_string());
        AppError::Validation(message)
    }
}

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::Forbidden(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::Upstream(_) => 502,
            AppError::Database(_)
            | AppError::Unexpected(_)
            | AppError::Internal(_)
            | AppError::Config(_) => 500,
        }
    }

    /// Message safe to show a client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_)
            | AppError::Unexpected(_)
            | AppError::Config(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

/// Replace opaque server-side failures with a route specific message.
///
/// Client errors (4xx) pass through unchanged.
pub trait Context<T> {
    fn context(self, message: &str) -> AppResult<T>;
}

impl<T> Context<T> for AppResult<T> {
    fn context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| match e {
            AppError::Database(detail) | AppError::Unexpected(detail) => {
                tracing::error!(error = %detail, "{}", message);
                AppError::Internal(message.to_string())
            }
            other => other,
        })
    }
}
