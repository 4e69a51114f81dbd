//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and from `SPENDWISE__*` environment variables
//! (e.g. `SPENDWISE__SERVER__PORT=8080`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis(String),
}

#[derive(Debug, Deserialize)]
pub struct Cache {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_report_ttl")]
    pub report_ttl_secs: u64,
    #[serde(default = "default_alert_ttl")]
    pub alert_ttl_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            report_ttl_secs: default_report_ttl(),
            alert_ttl_secs: default_alert_ttl(),
        }
    }
}

fn default_report_ttl() -> u64 {
    15 * 60
}

fn default_alert_ttl() -> u64 {
    24 * 60 * 60
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    #[serde(default)]
    pub cache: Cache,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("SPENDWISE")
                        .separator("__")
                        .try_parsing(true),
                )
                .build()?,
        )
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        config.try_deserialize()
    }
}
