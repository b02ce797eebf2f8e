//! Runtime settings, layered from defaults, `config.toml`, and the environment.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

pub const DEFAULT_CONFIG_FILE: &str = "config";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind_address: String,
    /// Largest roster upload accepted, in bytes.
    pub max_upload_bytes: usize,
}

impl Settings {
    /// Loads settings from the file `config_file` (any extension the `config` crate knows), then
    /// `ROLLCALL__SECTION__KEY` variables, then `DATABASE_URL`. The file is optional.
    pub fn load(config_file: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .set_default("database.url", "attendance.sqlite3")?
            .set_default("server.bind_address", "127.0.0.1:8000")?
            .set_default("server.max_upload_bytes", 5 * 1024 * 1024)?
            .add_source(File::with_name(config_file).required(false))
            .add_source(Environment::with_prefix("ROLLCALL").separator("__"))
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
    }
}
