//! Configuration types shared across crates.

use crate::error::{Error, Result};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides (`TALLY_SERVER__PORT=9000`).
pub const ENV_PREFIX: &str = "TALLY_";

/// Application identity and behavior flags.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Display name, used for the root page title and the startup banner.
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Version reported by the health endpoint.
    #[serde(default = "default_app_version")]
    pub version: String,
    /// Debug mode raises the default log level.
    #[serde(default)]
    pub debug: bool,
}

fn default_app_name() -> String {
    "Tally".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
            debug: false,
        }
    }
}

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to listen on.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    /// Allow cross-origin requests from any origin (default: true).
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Directory served under /static when it exists.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    /// HTML file served at /. Falls back to a built-in page.
    #[serde(default)]
    pub index_file: Option<PathBuf>,
    /// Name of the counter row exposed under /api/counter.
    #[serde(default = "default_counter_name")]
    pub counter_name: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_counter_name() -> String {
    crate::DEFAULT_COUNTER_NAME.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_enabled: true,
            cors_enabled: true,
            static_dir: None,
            index_file: None,
            counter_name: default_counter_name(),
        }
    }
}

impl ServerConfig {
    /// Socket address string in `host:port` form.
    ///
    /// IPv6 hosts are bracketed so the result parses as a `SocketAddr`.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Database file path (`:memory:` for a throwaway database).
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        /// Database host.
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password. Prefer TALLY_METADATA__PASSWORD over the config file.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds.
        #[serde(default)]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/tally.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            MetadataConfig::Sqlite { path } => {
                if path.as_os_str().is_empty() {
                    Err("sqlite config requires a non-empty 'path'".to_string())
                } else {
                    Ok(())
                }
            }
            MetadataConfig::Postgres {
                url,
                host,
                database,
                ..
            } => match (url.as_ref(), host.as_ref(), database.as_ref()) {
                (Some(_), _, _) => Ok(()),
                (None, Some(_), Some(_)) => Ok(()),
                (None, None, _) => Err(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ),
                (None, Some(_), None) => Err(
                    "postgres config requires 'database' when using individual fields".to_string(),
                ),
            },
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application identity.
    #[serde(default)]
    pub app: ApplicationConfig,
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then `TALLY_*` environment
    /// variables (`__` separates sections). A missing file is not an error.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let mut figment = Figment::new();
        if config_path.exists() {
            figment = figment.merge(Toml::file(config_path));
        }

        let config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        let name = self.server.counter_name.trim();
        if name.is_empty() {
            return Err(Error::InvalidConfig(
                "server.counter_name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > crate::MAX_COUNTER_NAME_LEN {
            return Err(Error::InvalidConfig(format!(
                "server.counter_name exceeds {} characters",
                crate::MAX_COUNTER_NAME_LEN
            )));
        }
        if self.server.port == 0 {
            return Err(Error::InvalidConfig("server.port cannot be 0".to_string()));
        }
        self.metadata.validate().map_err(Error::InvalidConfig)
    }

    /// Create a test configuration backed by the given SQLite file.
    ///
    /// **For testing only.** Metrics stay enabled so the endpoint can be exercised.
    pub fn for_testing(db_path: impl Into<PathBuf>) -> Self {
        Self {
            app: ApplicationConfig::default(),
            server: ServerConfig::default(),
            metadata: MetadataConfig::Sqlite {
                path: db_path.into(),
            },
        }
    }
}
