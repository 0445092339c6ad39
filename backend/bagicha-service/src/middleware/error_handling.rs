//! JSON error rendering shared by handlers, extractors and fallbacks.

use crate::error::AppError;
use actix_web::{
    error::{InternalError, JsonPayloadError, PathError, QueryPayloadError},
    http::StatusCode,
    web, HttpRequest, HttpResponse,
};
use serde::Serialize;

/// 10 MB, large enough for base64 images sent to the AI routes.
pub const JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub fn into_response(err: &AppError) -> HttpResponse {
    if err.is_server_error() {
        tracing::error!(error = %err, "request failed");
    } else {
        tracing::debug!(error = %err, "request rejected");
    }

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(ErrorBody::new(err.public_message()))
}

/// Default service for unknown routes.
pub async fn route_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorBody::new("Route not found"))
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            let message = match &err {
                JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
                    "Request body too large.".to_string()
                }
                JsonPayloadError::ContentType => "Expected a JSON body.".to_string(),
                other => format!("Invalid JSON body: {other}"),
            };
            bad_request(err, message)
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
        let message = format!("Invalid query: {err}");
        bad_request(err, message)
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err: PathError, _req: &HttpRequest| bad_request(err, "Invalid id."))
}

fn bad_request(
    err: impl std::fmt::Debug + std::fmt::Display + 'static,
    message: impl Into<String>,
) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorBody::new(message));
    InternalError::from_response(err, response).into()
}
