//! # Configuration Management for sqlweave
//!
//! This crate provides centralized configuration structures for the sqlweave
//! components: database connection, query cache and query composition settings.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{CacheConfig, DatabaseConfig, QueryConfig};
//!
//! let db_config = DatabaseConfig::new(
//!     "localhost".to_string(), 5432, "shop".to_string(),
//!     "postgres".to_string(), "password".to_string(),
//!     1, 10, 30, 600, 3600,
//! );
//!
//! let cache_config = CacheConfig::new(
//!     "redis://localhost:6379".to_string(),
//!     10, 5000, 100, 3000,
//! );
//!
//! let query_config = QueryConfig::new("entities.toml".to_string());
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! database = "shop"
//! username = "postgres"
//! password = "password"
//! min_connections = 1
//! max_connections = 10
//! connection_timeout_seconds = 30
//! idle_timeout_seconds = 600
//! max_lifetime_seconds = 3600
//!
//! [cache]
//! redis_url = "redis://localhost:6379"
//! pool_size = 10
//! timeout_ms = 5000
//! max_connections = 100
//! connection_timeout_ms = 3000
//! key_prefix = "sqlweave"
//! default_ttl_seconds = 300
//!
//! [query]
//! registry_path = "entities.toml"
//! cache_enabled = true
//! cache_ttl_seconds = 120
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from sqlweave.toml
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./sqlweave.toml";
const CONFIG_PATH_VAR: &str = "SQLWEAVE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    pub query: QueryConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub pool_size: u32,
    pub timeout_ms: u64,
    pub max_connections: u32,
    pub connection_timeout_ms: u64,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,
}

/// Query composition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Path of the TOML entity registry
    pub registry_path: String,
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default = "default_ttl_seconds")]
    pub cache_ttl_seconds: u64,
}

fn default_key_prefix() -> String {
    "sqlweave".to_string()
}

fn default_ttl_seconds() -> u64 {
    300
}

impl AppConfig {
    /// Load configuration from TOML file specified in .env or defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = {
            // A missing .env file is fine, the variable may come from the environment
            match dotenvy::dotenv() {
                Ok(_) => {}
                Err(e) if e.not_found() => {}
                Err(e) => return Err(e.into()),
            }

            if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
                Self::from_file(&config_path)
            } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
                Self::from_file(DEFAULT_CONFIG_PATH)
            } else {
                Err(ConfigError::Invalid(format!(
                    "Config path must be specified as {} or in {} file",
                    CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH
                )))
            }
        }?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        // Database validations
        if self.database.host.is_empty() {
            return Err(ConfigError::Invalid(
                "Database host cannot be empty".to_string(),
            ));
        }
        if self.database.port == 0 {
            return Err(ConfigError::Invalid(
                "Database port cannot be zero".to_string(),
            ));
        }
        if self.database.database.is_empty() {
            return Err(ConfigError::Invalid(
                "Database name cannot be empty".to_string(),
            ));
        }
        if self.database.username.is_empty() {
            return Err(ConfigError::Invalid(
                "Database username cannot be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "Database min_connections cannot be greater than max_connections".to_string(),
            ));
        }
        if self.database.connection_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Database connection_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        // Cache validations
        if let Some(cache) = &self.cache {
            if cache.redis_url.is_empty() {
                return Err(ConfigError::Invalid(
                    "Redis URL cannot be empty".to_string(),
                ));
            }
            if cache.pool_size == 0 {
                return Err(ConfigError::Invalid(
                    "Cache pool_size must be greater than 0".to_string(),
                ));
            }
            if cache.timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "Cache timeout_ms must be greater than 0".to_string(),
                ));
            }
            if cache.key_prefix.is_empty() {
                return Err(ConfigError::Invalid(
                    "Cache key_prefix cannot be empty".to_string(),
                ));
            }
        }

        // Query validations
        if self.query.registry_path.is_empty() {
            return Err(ConfigError::Invalid(
                "Query registry_path cannot be empty".to_string(),
            ));
        }
        if self.query.cache_enabled {
            if self.cache.is_none() {
                return Err(ConfigError::Invalid(
                    "Query cache_enabled requires a [cache] section".to_string(),
                ));
            }
            if self.query.cache_ttl_seconds == 0 {
                return Err(ConfigError::Invalid(
                    "Query cache_ttl_seconds must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new(
        redis_url: String,
        pool_size: u32,
        timeout_ms: u64,
        max_connections: u32,
        connection_timeout_ms: u64,
    ) -> Self {
        Self {
            redis_url,
            pool_size,
            timeout_ms,
            max_connections,
            connection_timeout_ms,
            key_prefix: default_key_prefix(),
            default_ttl_seconds: default_ttl_seconds(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

impl QueryConfig {
    /// Create a new query configuration with caching disabled
    pub fn new(registry_path: String) -> Self {
        Self {
            registry_path,
            cache_enabled: false,
            cache_ttl_seconds: default_ttl_seconds(),
        }
    }

    pub fn with_cache_ttl(mut self, ttl_seconds: u64) -> Self {
        self.cache_enabled = true;
        self.cache_ttl_seconds = ttl_seconds;
        self
    }
}

impl DatabaseConfig {
    /// Create a new database configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
        min_connections: u32,
        max_connections: u32,
        connection_timeout_seconds: u64,
        idle_timeout_seconds: u64,
        max_lifetime_seconds: u64,
    ) -> Self {
        Self {
            host,
            port,
            database,
            username,
            password,
            min_connections,
            max_connections,
            connection_timeout_seconds,
            idle_timeout_seconds,
            max_lifetime_seconds,
        }
    }

    /// Build connection string
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// Identifier of the target database without credentials, used in cache keys
    pub fn connection_id(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[database]
host = "localhost"
port = 5432
database = "shop"
username = "postgres"
password = "secret"
min_connections = 1
max_connections = 5
connection_timeout_seconds = 30
idle_timeout_seconds = 600
max_lifetime_seconds = 3600

[cache]
redis_url = "redis://localhost:6379"
pool_size = 4
timeout_ms = 1000
max_connections = 8
connection_timeout_ms = 500

[query]
registry_path = "entities.toml"
cache_enabled = true
cache_ttl_seconds = 60
"#;

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.connection_id(), "localhost:5432/shop");
        let cache = config.cache.unwrap();
        assert_eq!(cache.key_prefix, "sqlweave");
        assert_eq!(cache.default_ttl_seconds, 300);
        assert!(config.query.cache_enabled);
        assert_eq!(config.query.cache_ttl_seconds, 60);
    }

    #[test]
    fn test_cache_enabled_requires_cache_section() {
        let without_cache = SAMPLE.replace("[cache]", "[unused]");
        let err = AppConfig::from_toml_str(&without_cache);
        // unknown tables are ignored, so the missing [cache] is what fails
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_registry_path_rejected() {
        let broken = SAMPLE.replace("registry_path = \"entities.toml\"", "registry_path = \"\"");
        assert!(matches!(
            AppConfig::from_toml_str(&broken),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_connection_string() {
        let db = DatabaseConfig::new(
            "db".to_string(),
            5433,
            "app".to_string(),
            "user".to_string(),
            "pw".to_string(),
            1,
            2,
            30,
            60,
            0,
        );
        assert_eq!(db.connection_string(), "postgresql://user:pw@db:5433/app");
    }
}
