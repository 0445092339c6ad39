use actix_cors::Cors;
use actix_middleware::{CorrelationIdMiddleware, Logging};
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use bagicha_service::{
    config, db, logging,
    middleware::error_handling::{json_config, path_config, query_config, route_not_found},
    routes::{self, RouteLimits},
    services::{ai::AiChain, keep_alive, weather::Weather},
    state::AppState,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env().context("load configuration")?);
    tracing::info!(config = ?cfg, "configuration loaded");

    crypto_core::jwt::initialize_jwt_secret(&cfg.jwt_secret, cfg.jwt_expires_in_days)
        .context("initialize JWT secret")?;

    let db = db::init_pool(&cfg.database_url)
        .await
        .context("connect to database")?;

    let ai = AiChain::from_config(&cfg.ai_providers).context("build AI provider chain")?;
    tracing::info!(providers = ?ai.provider_names(), "AI provider chain ready");

    let state = AppState::new(db, cfg.clone(), Weather::unconfigured(), ai);
    let limits = RouteLimits::default();
    let origins = cfg.allowed_origins();

    if cfg.is_production() {
        if let Some(url) = cfg.self_ping_url.clone() {
            tracing::info!(%url, "keep-alive pinging enabled");
            keep_alive::spawn(url);
        }
    }

    let bind_addr = cfg.bind_addr();
    tracing::info!(%bind_addr, env = %cfg.app_env, "starting bagicha-service");

    HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .supports_credentials()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION]);

        App::new()
            .wrap(Logging)
            .wrap(CorrelationIdMiddleware)
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .configure(|cfg| routes::configure(cfg, &limits))
            .default_service(web::route().to(route_not_found))
    })
    .bind(&bind_addr)
    .with_context(|| format!("bind {bind_addr}"))?
    .run()
    .await
    .context("run HTTP server")?;

    tracing::info!("bagicha-service stopped");
    Ok(())
}
