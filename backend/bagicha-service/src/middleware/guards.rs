//! Request guards for authenticated handlers.

use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;
use actix_middleware::{bearer_token, UserId};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};

/// Represents an authenticated user extracted from JWT claims
///
/// `/api` runs `JwtAuthMiddleware` in optional mode, so public and protected
/// handlers share one scope. Taking `User` makes a handler protected;
/// `Option<User>` makes it optional-auth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
}

impl FromRequest for User {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        if let Some(UserId(id)) = req.extensions().get::<UserId>().copied() {
            return ready(Ok(User { id }));
        }

        let message = match bearer_token(req.headers()) {
            None => "Not authorized, no token",
            Some(_) => "Not authorized, token invalid",
        };
        ready(Err(AppError::Unauthorized(message.into()).into()))
    }
}
