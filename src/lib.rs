//! Vidhya core library.
//!
//! AI-assisted Ayurvedic prescription platform: practitioner accounts,
//! patient records, prescription history, and a hybrid recommendation
//! engine that blends that history with a generative fallback.

pub mod ai;
pub mod api;
pub mod auth;
pub mod db;
pub mod documents;
pub mod engine;
pub mod error;
pub mod models;

/// Application configuration
pub mod config {
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Config {
        pub server: ServerConfig,
        pub database: DatabaseConfig,
        pub auth: AuthConfig,
        pub ai: AiConfig,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct DatabaseConfig {
        /// `postgres://` selects the production backend; anything else is a
        /// SQLite path.
        pub url: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct AuthConfig {
        pub jwt_secret: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct AiConfig {
        pub api_key: String,
        pub base_url: Option<String>,
        pub model: Option<String>,
        /// Strict cap on one fallback call.
        pub timeout_secs: u64,
    }

    /// Load configuration: defaults, then `config/default` and
    /// `config/<VIDHYA_ENV>` files, then `VIDHYA_*` environment variables.
    pub fn load_config() -> Result<Config, ::config::ConfigError> {
        let env = std::env::var("VIDHYA_ENV").unwrap_or_else(|_| "development".into());

        ::config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("database.url", "sqlite:vidhya.db")?
            .set_default("auth.jwt_secret", "change-me-in-production")?
            .set_default("ai.api_key", "")?
            .set_default("ai.base_url", None::<String>)?
            .set_default("ai.model", None::<String>)?
            .set_default("ai.timeout_secs", 30)?
            .add_source(::config::File::with_name("config/default").required(false))
            .add_source(::config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(::config::Environment::with_prefix("VIDHYA").separator("__"))
            .build()?
            .try_deserialize()
    }
}
