//! HTTP API for the Vidhya service.

pub mod handlers;
pub mod middleware;
pub mod routes;

use crate::db::Database;
use crate::engine::RecommendationEngine;

pub use routes::configure;

/// Shared application state, constructed once in `main` and injected into
/// every handler.
pub struct AppState {
    pub engine: RecommendationEngine,
    pub db: Database,
    pub jwt_secret: String,
}
