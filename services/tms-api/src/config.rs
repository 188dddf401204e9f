//! Service configuration.
//!
//! Settings come from environment variables with defaults, plus an optional
//! YAML file carrying the network alias table:
//!
//! ```yaml
//! network_aliases:
//!   "NS_TTS_V3://ttn@000013":
//!     - thethingsnetwork
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use storage::{LivenessConfig, NetworkAliases, TileCacheConfig};

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub postgres: PostgresConfig,
    pub liveness: LivenessConfig,
    pub aliases: NetworkAliases,
}

/// Disk tile cache settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheConfig {
    /// Serve from and store to the tile cache.
    pub enabled: bool,
    pub circles_dir: PathBuf,
    pub blocks_dir: PathBuf,
    /// Scales every per-zoom freshness window.
    pub freshness_multiplier: f64,
}

impl CacheConfig {
    pub fn tile_cache_config(&self) -> TileCacheConfig {
        TileCacheConfig {
            freshness_multiplier: self.freshness_multiplier,
        }
    }
}

/// PostgreSQL connection settings.
#[derive(Clone, PartialEq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    /// Connection URL with credentials percent-encoded.
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            urlencoding::encode(&self.user),
            urlencoding::encode(&self.password),
            self.host,
            self.port,
            self.database
        )
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Contents of the optional YAML configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub network_aliases: NetworkAliases,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

impl ServiceConfig {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through `get`, which returns the value of a variable.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache = CacheConfig {
            enabled: parse_bool(&get, "CACHE_ENABLED", false)?,
            circles_dir: parse_var(&get, "CACHE_DIR_CIRCLES", PathBuf::from("./tile_cache/global_circles"))?,
            blocks_dir: parse_var(&get, "CACHE_DIR_BLOCKS", PathBuf::from("./tile_cache/global_blocks"))?,
            freshness_multiplier: parse_var(&get, "CACHE_FRESHNESS_MULTIPLIER", 1.0)?,
        };
        if !(cache.freshness_multiplier.is_finite() && cache.freshness_multiplier >= 0.0) {
            return Err(anyhow!(
                "Invalid CACHE_FRESHNESS_MULTIPLIER: {}",
                cache.freshness_multiplier
            ));
        }

        let postgres = PostgresConfig {
            host: parse_var(&get, "POSTGRES_HOST", "localhost".to_string())?,
            port: parse_var(&get, "POSTGRES_PORT", 5432)?,
            user: parse_var(&get, "POSTGRES_USER", "username".to_string())?,
            password: parse_var(&get, "POSTGRES_PASSWORD", "password".to_string())?,
            database: parse_var(&get, "POSTGRES_DATABASE", "database".to_string())?,
            max_connections: parse_var(&get, "POSTGRES_MAX_CONNECTIONS", 10)?,
        };

        let window_days: i64 = parse_var(&get, "LIVENESS_WINDOW_DAYS", 5)?;
        let window = chrono::Duration::try_days(window_days)
            .filter(|window| *window >= chrono::Duration::zero())
            .ok_or_else(|| anyhow!("Invalid LIVENESS_WINDOW_DAYS: {}", window_days))?;

        let defaults = LivenessConfig::default();
        let liveness = LivenessConfig {
            window,
            ttl: Duration::from_secs(parse_var(&get, "LIVENESS_TTL_SECS", defaults.ttl.as_secs())?),
            cleanup_interval: Duration::from_secs(parse_var(
                &get,
                "LIVENESS_CLEANUP_SECS",
                defaults.cleanup_interval.as_secs(),
            )?),
            capacity: parse_var(&get, "LIVENESS_CAPACITY", defaults.capacity)?,
        };

        Ok(Self {
            cache,
            postgres,
            liveness,
            aliases: NetworkAliases::new(),
        })
    }

    /// Merge the YAML file at `path` into this configuration.
    pub fn with_file(mut self, path: &Path) -> Result<Self> {
        let file = FileConfig::load(path)?;
        self.aliases = file.network_aliases;
        Ok(self)
    }

    /// Log the effective configuration. The password is never logged.
    pub fn log_summary(&self) {
        tracing::info!(
            cache_enabled = self.cache.enabled,
            circles_dir = %self.cache.circles_dir.display(),
            blocks_dir = %self.cache.blocks_dir.display(),
            freshness_multiplier = self.cache.freshness_multiplier,
            postgres_host = %self.postgres.host,
            postgres_port = self.postgres.port,
            postgres_user = %self.postgres.user,
            postgres_database = %self.postgres.database,
            postgres_max_connections = self.postgres.max_connections,
            liveness_window_days = self.liveness.window.num_days(),
            liveness_ttl_secs = self.liveness.ttl.as_secs(),
            liveness_capacity = self.liveness.capacity,
            network_aliases = self.aliases.len(),
            "Configuration loaded"
        );
    }
}

fn parse_var<F, T>(get: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}: '{}' ({})", key, value, e)),
        None => Ok(default),
    }
}

fn parse_bool<F>(get: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" || v == "1" || v == "yes" => Ok(true),
        Some(v) if v == "false" || v == "0" || v == "no" || v.is_empty() => Ok(false),
        Some(v) => Err(anyhow!("Invalid {}: '{}'", key, v)),
    }
}
