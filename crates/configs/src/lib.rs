//! # configs
//!
//! Typed runtime settings for the UpNest client engine. Values are layered:
//! built-in defaults, then an optional `upnest.toml`, then `UPNEST_*`
//! environment variables (a `.env` file is honored if present).

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the real backend, including the API prefix.
    pub base_url: String,
    /// Per-request timeout for the REST transport.
    pub timeout_ms: u64,
    /// When set, the engine runs against the in-memory transport only.
    pub use_mock: bool,
    /// Initial bearer token, if already known at startup.
    #[serde(default)]
    pub access_token: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct TransportSettings {
    /// Simulated latency of the in-memory transport.
    pub latency_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub transport: TransportSettings,
    /// `tracing` env-filter directive, e.g. `info,services=debug`.
    pub log_filter: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Config::builder()
            .set_default("api.base_url", "http://localhost:8080/api/v1")?
            .set_default("api.timeout_ms", 5_000_i64)?
            .set_default("api.use_mock", true)?
            .set_default("transport.latency_ms", 0_i64)?
            .set_default("log_filter", "info")?
            .add_source(File::with_name("upnest").required(false))
            .add_source(Environment::with_prefix("UPNEST").separator("__"))
            .build()?;
        let settings: Settings = config.try_deserialize()?;
        debug!(base_url = %settings.api.base_url, use_mock = settings.api.use_mock, "settings loaded");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_dev_backend() {
        let settings = Settings::load().expect("defaults must load");
        assert_eq!(settings.api.base_url, "http://localhost:8080/api/v1");
        assert_eq!(settings.api.timeout_ms, 5_000);
        assert!(settings.api.use_mock);
        assert!(settings.api.access_token.is_none());
    }
}
