//! Patient registry core library
//!
//! This module exports the storage, model, registry and HTTP layers of the
//! patient registry service.

pub mod api;
pub mod db;
pub mod models;
pub mod registry;
pub mod telemetry;

/// Application configuration
pub mod config {
    use serde::Deserialize;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Config {
        pub server: ServerConfig,
        pub storage: StorageConfig,
        pub log: LogConfig,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct StorageConfig {
        /// JSON file holding every patient record.
        pub path: PathBuf,
        /// Write an empty collection at startup if the file is absent.
        pub create_if_missing: bool,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct LogConfig {
        pub format: LogFormat,
        /// `EnvFilter` directives; `RUST_LOG` takes precedence.
        pub filter: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum LogFormat {
        Pretty,
        Json,
    }

    /// Load configuration from defaults, files and the environment
    pub fn load_config() -> Result<Config, ::config::ConfigError> {
        let env = std::env::var("PATIENTS_ENV").unwrap_or_else(|_| "development".into());

        ::config::Config::builder()
            // Start with default settings
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("storage.path", "patients.json")?
            .set_default("storage.create_if_missing", true)?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info")?
            .add_source(::config::File::with_name("config/default").required(false))
            // Override with environment-specific settings
            .add_source(::config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables, e.g. PATIENTS__SERVER__PORT
            .add_source(::config::Environment::with_prefix("PATIENTS").separator("__"))
            .build()?
            .try_deserialize()
    }

}
