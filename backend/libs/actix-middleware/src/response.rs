use actix_web::{error::InternalError, http::StatusCode, HttpResponse};

/// Build an actix error whose body is `{"success": false, "message": ...}`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> actix_web::Error {
    let message = message.into();
    let response = HttpResponse::build(status).json(serde_json::json!({
        "success": false,
        "message": message,
    }));
    InternalError::from_response(message, response).into()
}
