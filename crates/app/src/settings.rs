//! Handles settings for the application. Configuration is read from
//! `settings.toml` (optional) and from `SPARTIAMO__*` environment variables,
//! e.g. `SPARTIAMO__APP__LEVEL=debug`.
//!
//! See `settings.example.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Eq)]
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

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("./spartiamo.db".to_string())
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct EngineSettings {
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_country_code: default_country_code(),
        }
    }
}

fn default_country_code() -> String {
    engine::DEFAULT_COUNTRY_CODE.to_string()
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub engine: EngineSettings,
}

impl Settings {
    /// Loads `<name>.toml` (if present) and the environment overrides.
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        Self::from_builder(Config::builder().add_source(File::with_name(name).required(false)))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .add_source(Environment::with_prefix("SPARTIAMO").separator("__"))
            .build()?
            .try_deserialize()
    }
}
