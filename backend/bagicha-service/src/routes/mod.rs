//! HTTP and WebSocket routes.
//!
//! Everything under `/api` runs behind optional JWT auth and the general
//! rate limiter; handlers that take [`crate::middleware::User`] are the
//! protected ones. `/health`, `/` and `/ws` sit outside the limiter.

pub mod ai;
pub mod auth;
pub mod featured;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod users;
pub mod weather;
pub mod wsroute;

use actix_middleware::{JwtAuthMiddleware, RateLimitConfig, RateLimitMiddleware};
use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// Rate limiters shared by every worker.
#[derive(Clone)]
pub struct RouteLimits {
    pub api: RateLimitMiddleware,
    pub ai: RateLimitMiddleware,
}

impl RouteLimits {
    pub fn new(api: RateLimitConfig, ai: RateLimitConfig) -> Self {
        Self {
            api: RateLimitMiddleware::new(api),
            ai: RateLimitMiddleware::new(ai),
        }
    }

    pub fn ai_config() -> RateLimitConfig {
        RateLimitConfig {
            max_requests: 10,
            window: Duration::from_secs(60),
            message: "AI rate limit hit. Please wait a moment.".to_string(),
        }
    }
}

impl Default for RouteLimits {
    fn default() -> Self {
        Self::new(RateLimitConfig::default(), Self::ai_config())
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, limits: &RouteLimits) {
    cfg.service(health::root)
        .service(health::health)
        .service(wsroute::ws_handler)
        .service(
            web::scope("/api")
                .wrap(limits.api.clone())
                .wrap(JwtAuthMiddleware::optional())
                .service(
                    web::scope("/auth")
                        .service(auth::register)
                        .service(auth::login)
                        .service(auth::me)
                        .service(auth::update_location)
                        .service(auth::update_profile)
                        .service(auth::logout),
                )
                .service(
                    web::scope("/posts")
                        .service(posts::get_feed)
                        .service(posts::create_post)
                        .service(posts::get_user_posts)
                        .service(posts::get_post)
                        .service(posts::update_post)
                        .service(posts::delete_post)
                        .service(posts::toggle_interest)
                        .service(posts::mark_swapped),
                )
                .service(
                    web::scope("/messages")
                        .service(messages::get_conversations)
                        .service(messages::send_message)
                        .service(messages::get_thread),
                )
                .service(
                    web::scope("/notifications")
                        .service(notifications::get_notifications)
                        .service(notifications::mark_all_read)
                        .service(notifications::mark_read)
                        .service(notifications::delete_notification),
                )
                .service(
                    web::scope("/users")
                        .service(users::leaderboard)
                        .service(users::get_user)
                        .service(users::get_user_posts),
                )
                .service(web::scope("/featured").service(featured::plant_of_the_day))
                .service(
                    web::scope("/weather")
                        .service(weather::current)
                        .service(weather::geocode)
                        .service(weather::search)
                        .service(weather::full),
                )
                .service(
                    web::scope("/ai")
                        .wrap(limits.ai.clone())
                        .service(ai::analyze)
                        .service(ai::analyze_base64)
                        .service(ai::find_matches)
                        .service(ai::care_schedule),
                ),
        );
}

/// `{"success": true, "data": ...}`
pub(crate) fn ok_data<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}

/// `{"success": true, "message": ..., "data": ...}`
pub(crate) fn ok_message<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "message": message, "data": data }))
}

/// Blank strings count as missing.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Pune ")), Some("Pune"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_ai_limit() {
        let cfg = RouteLimits::ai_config();
        assert_eq!(cfg.max_requests, 10);
        assert_eq!(cfg.window, Duration::from_secs(60));
    }
}
