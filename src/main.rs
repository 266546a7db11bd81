//! Vidhya API server
//!
//! Main entry point: configuration, store connection, engine wiring, and
//! the HTTP listener.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use vidhya::ai::AiService;
use vidhya::db::Database;
use vidhya::engine::RecommendationEngine;
use vidhya::{api, config};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::load_config()?;

    let db = Database::connect(&config.database.url).await?;

    // The generative fallback and the store are explicit handles injected
    // into the engine, never process-wide singletons.
    let ai = Arc::new(AiService::new(
        config.ai.api_key.clone(),
        config.ai.base_url.clone(),
        config.ai.model.clone(),
    ));
    let engine = RecommendationEngine::new(db.clone(), ai, config.ai.timeout_secs);

    let state = web::Data::new(api::AppState {
        engine,
        db,
        jwt_secret: config.auth.jwt_secret.clone(),
    });

    info!(host = %config.server.host, port = config.server.port, "starting Vidhya API");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            // The original mobile client is served cross-origin.
            .wrap(Cors::permissive())
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
