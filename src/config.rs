use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::chatbot::gemini::DEFAULT_MODEL;

/// Config file used when no path is passed on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "geminicord.json";

const DEFAULT_PG_PORT: u16 = 5432;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file '{}': {source}", .path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    #[error("failed to parse config file '{}': {source}", .path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// A required value is absent from both the file and the environment.
    #[error("missing required config value: {0}")]
    Missing(&'static str),
    /// A port value is not a valid u16.
    #[error("invalid port for {name}: '{value}'")]
    InvalidPort { name: &'static str, value: String },
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    discord_token: Option<String>,
    gemini_api_key: Option<String>,
    /// Gemini model name, e.g. "gemini-1.5-flash"
    gemini_model: Option<String>,
    #[serde(default)]
    database: DatabaseFile,
    /// Port for the keep-alive HTTP endpoint (disabled when unset).
    keepalive_port: Option<u16>,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
}

#[derive(Deserialize, Default)]
struct DatabaseFile {
    host: Option<String>,
    port: Option<u16>,
    name: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

/// PostgreSQL connection parameters.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable process configuration, built once in `main` and handed to
/// each component's constructor.
#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub database: DatabaseConfig,
    pub keepalive_port: Option<u16>,
    pub data_dir: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"<redacted>")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("database", &self.database)
            .field("keepalive_port", &self.keepalive_port)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an injectable environment lookup.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                serde_json::from_str(&content).map_err(|e| ConfigError::ParseJson {
                    path: path.to_path_buf(),
                    source: e,
                })?
            }
            None => ConfigFile::default(),
        };

        // Empty strings count as absent so `FOO=` in a .env doesn't slip through
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let pick = |env_key: &str, file_value: Option<String>| {
            env(env_key).or(file_value.filter(|v| !v.trim().is_empty()))
        };

        let discord_token =
            pick("DISCORD_TOKEN", file.discord_token).ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        let gemini_api_key =
            pick("GEMINI_API_KEY", file.gemini_api_key).ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
        let gemini_model =
            pick("GEMINI_MODEL", file.gemini_model).unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let db = file.database;
        let port = match env("PGPORT") {
            Some(value) => parse_port("PGPORT", value)?,
            None => db.port.unwrap_or(DEFAULT_PG_PORT),
        };
        let database = DatabaseConfig {
            host: pick("PGHOST", db.host).ok_or(ConfigError::Missing("PGHOST"))?,
            port,
            name: pick("PGDATABASE", db.name).ok_or(ConfigError::Missing("PGDATABASE"))?,
            user: pick("PGUSER", db.user).ok_or(ConfigError::Missing("PGUSER"))?,
            password: pick("PGPASSWORD", db.password).ok_or(ConfigError::Missing("PGPASSWORD"))?,
        };

        let keepalive_port = match env("PORT") {
            Some(value) => Some(parse_port("PORT", value)?),
            None => file.keepalive_port,
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            discord_token,
            gemini_api_key,
            gemini_model,
            database,
            keepalive_port,
            data_dir,
        })
    }
}

fn parse_port(name: &'static str, value: String) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidPort { name, value })
}
