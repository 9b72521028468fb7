//! Configuration for the MySQL MCP server
//!
//! Loaded once at startup from TOML. Everything the request path needs is
//! derived from it as immutable values ([`AdmissionPolicy`], [`ExecutionLimits`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::AdmissionPolicy;
use crate::executor::ExecutionLimits;

/// Timeout applied when `query_timeout_seconds` is unset or non-positive
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Row cap applied when `max_rows` is unset or non-positive
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Pool size applied when `max_open_conns` is unset or non-positive
pub const DEFAULT_MAX_OPEN_CONNS: u32 = 10;

const DEFAULT_SERVER_NAME: &str = "mysql-readonly";
const DEFAULT_SERVER_VERSION: &str = "v1.0.0";

fn default_allow_statement_prefixes() -> Vec<String> {
    ["select", "show", "describe", "explain"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_deny_substrings() -> Vec<String> {
    [
        " into outfile",
        " into dumpfile",
        " for update",
        " lock in share mode",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("no config file found (tried: {0})")]
    NotFound(String),

    #[error("mysql.dsn is required in config")]
    MissingDsn,

    #[error("invalid mysql.dsn: {0}")]
    InvalidDsn(String),
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mysql: MysqlConfig,
}

/// MCP server identity reported during initialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

/// Connection, pool and admission settings
///
/// Numeric limits are signed so that zero and negative values can mean
/// "use the default", as older config files expect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MysqlConfig {
    /// `mysql://` URL or `user:pass@tcp(host:port)/db` DSN
    pub dsn: String,
    pub max_open_conns: i64,
    /// Accepted for compatibility; the sqlx pool has no idle cap
    pub max_idle_conns: i64,
    pub conn_max_lifetime_seconds: i64,
    pub conn_max_idle_time_seconds: i64,
    pub query_timeout_seconds: i64,
    /// Informational; enforcement lives in the classifier
    pub allow_statement_prefixes: Vec<String>,
    pub deny_substrings: Vec<String>,
    pub max_rows: i64,
}

impl Config {
    /// Parse a config document and fill in defaults
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;
        config.apply_defaults();
        Ok(config)
    }

    /// Read and parse the config file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve which config file to load
    ///
    /// An explicit path always wins. Otherwise the first existing file of:
    /// 1. `./config.toml`
    /// 2. `./mysql-mcp.toml`
    /// 3. `$XDG_CONFIG_HOME/mysql-mcp/config.toml`
    /// 4. `~/.binks/mysql.toml`
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let mut candidates = vec![PathBuf::from("config.toml"), PathBuf::from("mysql-mcp.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("mysql-mcp").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".binks").join("mysql.toml"));
        }

        if let Some(found) = candidates.iter().find(|p| p.exists()) {
            return Ok(found.clone());
        }

        let tried = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ConfigError::NotFound(tried))
    }

    /// Check the settings that have no sensible default
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mysql.dsn.trim().is_empty() {
            return Err(ConfigError::MissingDsn);
        }
        Ok(())
    }

    fn apply_defaults(&mut self) {
        if self.server.name.is_empty() {
            self.server.name = DEFAULT_SERVER_NAME.to_string();
        }
        if self.server.version.is_empty() {
            self.server.version = DEFAULT_SERVER_VERSION.to_string();
        }
        if self.mysql.allow_statement_prefixes.is_empty() {
            self.mysql.allow_statement_prefixes = default_allow_statement_prefixes();
        }
        if self.mysql.deny_substrings.is_empty() {
            self.mysql.deny_substrings = default_deny_substrings();
        }
    }
}

impl MysqlConfig {
    pub fn query_timeout(&self) -> Duration {
        positive(self.query_timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_QUERY_TIMEOUT)
    }

    pub fn max_rows(&self) -> usize {
        positive(self.max_rows)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_ROWS)
    }

    pub fn max_connections(&self) -> u32 {
        positive(self.max_open_conns)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(DEFAULT_MAX_OPEN_CONNS)
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        positive(self.conn_max_lifetime_seconds).map(Duration::from_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        positive(self.conn_max_idle_time_seconds).map(Duration::from_secs)
    }

    pub fn limits(&self) -> ExecutionLimits {
        ExecutionLimits {
            timeout: self.query_timeout(),
            max_rows: self.max_rows(),
        }
    }

    pub fn admission_policy(&self) -> AdmissionPolicy {
        AdmissionPolicy::new(
            normalize_list(&self.allow_statement_prefixes),
            normalize_list(&self.deny_substrings),
        )
    }
}

/// Lower-case and trim each entry, dropping the ones left empty
pub fn normalize_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn positive(value: i64) -> Option<u64> {
    u64::try_from(value).ok().filter(|v| *v > 0)
}
