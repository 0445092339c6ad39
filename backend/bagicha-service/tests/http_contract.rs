//! HTTP contract tests against the real route table.
//!
//! The database is unreachable here, so every case is answered before any
//! query runs (validation, auth, collaborator-only routes).

#[macro_use]
mod common;

use actix_middleware::RateLimitConfig;
use actix_web::{http::StatusCode, test};
use bagicha_service::routes::RouteLimits;
use common::{bearer, offline_state, send};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

#[actix_web::test]
async fn test_root_reports_version() {
    let app = init_app!(offline_state());
    let (status, body) = send(&app, test::TestRequest::get().uri("/").to_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "🌿 BagichaLink API is running");
    assert_eq!(body["version"], "1.0.0");
}

#[actix_web::test]
async fn test_health_reports_disconnected_database() {
    let app = init_app!(offline_state());
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-correlation-id"));
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "disconnected");
    assert!(body["uptime"].as_f64().is_some());
    assert!(body["timestamp"].is_string());
}

#[actix_web::test]
async fn test_unknown_route_is_json_404() {
    let app = init_app!(offline_state());
    let (status, body) = send(&app, test::TestRequest::get().uri("/api/nope").to_request()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Route not found" }));
}

#[actix_web::test]
async fn test_protected_route_requires_token() {
    let app = init_app!(offline_state());

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/auth/me").to_request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, no token");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, token invalid");
}

#[actix_web::test]
async fn test_logout_is_stateless() {
    let app = init_app!(offline_state());
    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(bearer(Uuid::new_v4()))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully.");
}

#[actix_web::test]
async fn test_register_rejects_missing_and_invalid_fields() {
    let app = init_app!(offline_state());

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "name": "Asha", "email": "asha@example.com" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name, email, and password are required.");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "name": "Asha", "email": "asha@example.com", "password": "123" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Password must be at least 6 characters.");
}

#[actix_web::test]
async fn test_login_requires_credentials() {
    let app = init_app!(offline_state());
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "asha@example.com" }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email and password are required.");
}

#[actix_web::test]
async fn test_malformed_json_and_ids_are_400() {
    let app = init_app!(offline_state());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/posts/not-a-uuid").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid id.");
}

#[actix_web::test]
async fn test_create_post_validates_before_storage() {
    let app = init_app!(offline_state());
    let auth = bearer(Uuid::new_v4());

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(auth.clone())
        .set_json(json!({ "type": "selling", "title": "Monstera" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Post type must be 'available' or 'wanted'.");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(auth)
        .set_json(json!({ "type": "wanted", "description": "x".repeat(501) }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Description cannot exceed 500 characters.");
}

#[actix_web::test]
async fn test_send_message_requires_recipient_and_content() {
    let app = init_app!(offline_state());
    let req = test::TestRequest::post()
        .uri("/api/messages")
        .insert_header(bearer(Uuid::new_v4()))
        .set_json(json!({ "recipientId": Uuid::new_v4(), "content": "   " }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "recipientId and content are required.");
}

#[actix_web::test]
async fn test_weather_routes() {
    let app = init_app!(offline_state());

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/weather/current?lat=18.5").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "lat and lon are required.");

    let (status, body) = send(
        &app,
        test::TestRequest::get().uri("/api/weather/current?lat=18.52&lon=73.85").to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["condition"], "Light Rain");
    assert_eq!(body["data"]["isRaining"], true);

    let (status, body) = send(
        &app,
        test::TestRequest::get().uri("/api/weather/full?lat=18.52&lon=73.85").to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["location"]["city"], "Pune");
    assert_eq!(body["data"]["weather"]["unit"], "metric");

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/weather/search?q=p").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Search query must be at least 2 characters.");

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/weather/search?q=pun").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["countryCode"], "IN");

    // provider failures degrade to an empty list
    let (status, body) = send(&app, test::TestRequest::get().uri("/api/weather/search?q=nowhere").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[actix_web::test]
async fn test_ai_analyze() {
    let app = init_app!(offline_state());

    let req = test::TestRequest::post()
        .uri("/api/ai/analyze")
        .set_json(json!({ "imageUrl": "https://img.example.com/leaf.jpg" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let auth = bearer(Uuid::new_v4());
    let req = test::TestRequest::post()
        .uri("/api/ai/analyze")
        .insert_header(auth.clone())
        .set_json(json!({}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide an image file or imageUrl.");

    let req = test::TestRequest::post()
        .uri("/api/ai/analyze")
        .insert_header(auth)
        .set_json(json!({ "imageUrl": "https://img.example.com/leaf.jpg", "lat": 18.52, "lon": 73.85 }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["commonName"], "Money Plant");
    assert_eq!(body["imageUrl"], "https://img.example.com/leaf.jpg");
    assert_eq!(body["weather"]["condition"], "Light Rain");
}

#[actix_web::test]
async fn test_ai_base64_and_match_validation() {
    let app = init_app!(offline_state());
    let auth = bearer(Uuid::new_v4());

    let req = test::TestRequest::post()
        .uri("/api/ai/analyze-base64")
        .insert_header(auth.clone())
        .set_json(json!({ "imageBase64": "aGVsbG8=" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "imageBase64 and mimeType are required.");

    let req = test::TestRequest::post()
        .uri("/api/ai/analyze-base64")
        .insert_header(auth.clone())
        .set_json(json!({ "imageBase64": "data:image/png;base64,@@@", "mimeType": "image/png" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "imageBase64 is not valid base64.");

    let req = test::TestRequest::post()
        .uri("/api/ai/match")
        .insert_header(auth)
        .set_json(json!({}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "postId is required.");
}

#[actix_web::test]
async fn test_ai_rate_limit() {
    let limits = RouteLimits::new(
        RateLimitConfig::default(),
        RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
            ..RouteLimits::ai_config()
        },
    );
    let app = init_app!(offline_state(), limits);
    let auth = bearer(Uuid::new_v4());

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/ai/analyze")
            .insert_header(auth.clone())
            .set_json(json!({}))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let req = test::TestRequest::post()
        .uri("/api/ai/analyze")
        .insert_header(auth)
        .set_json(json!({}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "AI rate limit hit. Please wait a moment.");

    // the rest of the API keeps working
    let (status, _) = send(&app, test::TestRequest::get().uri("/api/weather/search?q=pune").to_request()).await;
    assert_eq!(status, StatusCode::OK);
}
