//! Handles settings for the application. Configuration is written in
//! `settings.toml` and can be overridden with `KOPERASI_*` environment
//! variables (`KOPERASI_SERVER__PORT=8080`).
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    /// Tracing level for the koperasi crates (`trace`..`error`).
    pub level: String,
}

/// Where the ledger lives.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    /// Throwaway in-memory SQLite database.
    Memory,
    /// Path of a SQLite file, created if missing.
    Sqlite(String),
    /// Any sea-orm connection URL.
    Url(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
            Database::Url(url) => url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub database: Database,
    pub bind: Option<String>,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("KOPERASI").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
