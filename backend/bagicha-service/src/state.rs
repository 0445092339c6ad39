use crate::{
    config::Config,
    services::{ai::AiChain, weather::Weather},
    websocket::RoomRegistry,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub rooms: RoomRegistry,
    pub config: Arc<Config>,
    /// Weather and geocoding lookups (neutral values when unconfigured)
    pub weather: Weather,
    /// AI providers, tried in order
    pub ai: Arc<AiChain>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<Config>, weather: Weather, ai: AiChain) -> Self {
        Self {
            db,
            rooms: RoomRegistry::new(),
            config,
            weather,
            ai: Arc::new(ai),
            started_at: Utc::now(),
        }
    }

    /// Seconds since the process started.
    pub fn uptime_secs(&self) -> f64 {
        (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
