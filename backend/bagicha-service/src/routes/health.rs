use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use std::time::Duration;

const DB_PING_TIMEOUT: Duration = Duration::from_secs(2);

#[get("/")]
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "🌿 BagichaLink API is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let db = if db_pool::ping(&state.db, DB_PING_TIMEOUT).await {
        "connected"
    } else {
        "disconnected"
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "uptime": state.uptime_secs(),
        "timestamp": Utc::now(),
        "db": db,
        "sockets": state.rooms.connection_count().await,
    }))
}
