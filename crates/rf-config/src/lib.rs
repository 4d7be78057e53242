//! # rf-config
//!
//! Layered settings for the forum binary: built-in defaults, an optional
//! `forum.toml`, then `FORUM_*` environment variables (a `.env` file is
//! loaded first when present). Nested keys use a double underscore, e.g.
//! `FORUM_STORE__BACKEND=redis`.

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "FORUM";
pub const CONFIG_FILE: &str = "forum";
pub const MIN_TOKEN_BYTES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub redis_url: Option<SecretString>,
    pub pool_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: None,
            pool_size: 16,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. "info,rf_core=debug".
    pub filter: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub token_bytes: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            token_bytes: MIN_TOKEN_BYTES,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub page_size: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

/// Optional first-run data. Nothing is seeded unless set.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    pub admin_username: Option<String>,
    pub admin_password: Option<SecretString>,
    pub categories: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub log: LogSettings,
    pub session: SessionSettings,
    pub pagination: PaginationSettings,
    pub seed: SeedSettings,
}

impl Settings {
    /// Reads `.env`, `forum.toml` and the process environment, then validates.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_sources(File::with_name(CONFIG_FILE).required(false), env_source())
    }

    /// Builds settings from explicit sources. `load` is the production entry.
    pub fn from_sources(
        file: impl config::Source + Send + Sync + 'static,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Redis && self.store.redis_url.is_none() {
            return Err(ConfigError::Invalid(
                "store.redis_url is required when store.backend = redis".into(),
            ));
        }
        if self.store.pool_size == 0 {
            return Err(ConfigError::Invalid("store.pool_size must be at least 1".into()));
        }
        if self.session.token_bytes < MIN_TOKEN_BYTES {
            return Err(ConfigError::Invalid(format!(
                "session.token_bytes must be at least {MIN_TOKEN_BYTES}"
            )));
        }
        if self.pagination.page_size == 0 {
            return Err(ConfigError::Invalid("pagination.page_size must be at least 1".into()));
        }
        if self.seed.admin_username.is_some() && self.seed.admin_password.is_none() {
            return Err(ConfigError::Invalid(
                "seed.admin_password is required with seed.admin_username".into(),
            ));
        }
        Ok(())
    }
}

/// `FORUM_SEED__CATEGORIES=General,Off Topic` becomes a list.
pub fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("seed.categories")
        .try_parsing(true)
}
