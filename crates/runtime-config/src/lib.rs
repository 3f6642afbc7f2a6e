//! Shared daemon/CLI configuration types.
//!
//! Both `campcook-daemon` and the `campcook` CLI read/write `campcook.toml`
//! using these types. The collector address is revalidated every time an
//! endpoint is requested; a bad host or port is an error, never replaced by
//! a default.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::path::Path;
use std::sync::OnceLock;

/// Canonical config file name used by daemon/cli.
pub const CONFIG_FILE_NAME: &str = "campcook.toml";

pub const ENV_SERVER_HOST: &str = "CAMPCOOK_SERVER_HOST";
pub const ENV_SERVER_PORT: &str = "CAMPCOOK_SERVER_PORT";
pub const ENV_DATA_DIR: &str = "CAMPCOOK_DATA_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid collector host {0:?}")]
    InvalidHost(String),
    #[error("invalid collector port {0}: must be within 1..=65535")]
    InvalidPort(u32),
    #[error("unsupported scheme {0:?}: expected http or https")]
    InvalidScheme(String),
    #[error("environment variable {var} has invalid value {value:?}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration (persisted as `campcook.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CampcookConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_host")]
    pub host: String,
    /// Kept wider than `u16` so out-of-range values survive parsing and are
    /// reported by [`ServerSettings::endpoint`].
    #[serde(default = "default_port")]
    pub port: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Interval of the daemon's pending-sync sweep. 0 disables it.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
    /// Interval of the daemon's collector probe. 0 disables it.
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            retry_interval_secs: default_retry_interval(),
            health_check_interval_secs: default_health_check_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One JSON document per key under the data directory.
    #[default]
    #[serde(alias = "json", alias = "files")]
    File,
    /// Key/value table in a local SQLite database.
    #[serde(alias = "sqlite3", alias = "db")]
    Sqlite,
    /// Unknown/invalid values are normalized by compatibility fallbacks.
    #[serde(other)]
    Unknown,
}

/// A validated collector address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    scheme: String,
    host: String,
    port: u16,
}

impl ServerEndpoint {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `scheme://host:port`, without a trailing slash.
    pub fn base_url(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

impl ServerSettings {
    /// Validate host, port and scheme and build the collector endpoint.
    pub fn endpoint(&self) -> Result<ServerEndpoint, ConfigError> {
        let scheme = self.scheme.trim().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::InvalidScheme(self.scheme.clone()));
        }
        let host = self.host.trim();
        if !is_valid_host(host) {
            return Err(ConfigError::InvalidHost(self.host.clone()));
        }
        let port = u16::try_from(self.port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(ConfigError::InvalidPort(self.port))?;
        Ok(ServerEndpoint {
            scheme,
            host: host.to_string(),
            port,
        })
    }
}

fn ipv4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^((25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
        )
        .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

/// IPv4 dotted quad, IPv6 literal, or RFC 1123 hostname.
pub fn is_valid_host(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    if host.parse::<Ipv6Addr>().is_ok() {
        return true;
    }
    let all_numeric = host.split('.').all(|l| l.bytes().all(|b| b.is_ascii_digit()));
    if all_numeric {
        return ipv4_pattern().is_match(host);
    }
    host.split('.').all(|label| label_pattern().is_match(label))
}

impl CampcookConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: CampcookConfig = toml::from_str(raw)?;
        apply_compat_fallbacks(&mut config);
        Ok(config)
    }

    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Overlay `CAMPCOOK_*` environment values read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_SERVER_HOST) {
            self.server.host = host.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_SERVER_PORT) {
            self.server.port = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_SERVER_PORT,
                value: raw.clone(),
            })?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = Some(dir);
        }
        Ok(())
    }

    /// [`apply_env_overrides`](Self::apply_env_overrides) against the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }
}

/// Apply compatibility fallbacks after loading raw TOML.
/// Returns true when any field was updated.
pub fn apply_compat_fallbacks(config: &mut CampcookConfig) -> bool {
    let mut changed = false;

    if config.storage.backend == StorageBackend::Unknown {
        config.storage.backend = StorageBackend::File;
        changed = true;
    }

    if config.server.scheme.trim().is_empty() {
        config.server.scheme = default_scheme();
        changed = true;
    }

    changed
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_scheme() -> String {
    "http".to_string()
}
fn default_host() -> String {
    "172.16.70.101".to_string()
}
fn default_port() -> u32 {
    5000
}
fn default_max_retries() -> u32 {
    3
}
fn default_request_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_retry_interval() -> u64 {
    60
}
fn default_health_check_interval() -> u64 {
    300
}
