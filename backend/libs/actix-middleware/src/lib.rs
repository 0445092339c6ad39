//! # Actix Middleware Library
//!
//! Shared middleware for BagichaLink actix services
//!
//! ## Modules
//! - `jwt_auth`: bearer-token authentication (required or optional)
//! - `rate_limit`: per-client governor rate limiting
//! - `correlation_id`: request correlation ids
//! - `logging`: tracing request/response logs

pub mod correlation_id;
pub mod jwt_auth;
pub mod logging;
pub mod rate_limit;

mod response;

pub use correlation_id::{get_correlation_id, CorrelationId, CorrelationIdMiddleware};
pub use jwt_auth::{bearer_token, JwtAuthMiddleware, UserId};
pub use logging::Logging;
pub use rate_limit::{RateLimitConfig, RateLimitMiddleware};
pub use response::json_error;
