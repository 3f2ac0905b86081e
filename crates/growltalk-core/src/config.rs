//! Configuration system for GrowlTalk
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables. The relay binary applies command line flags last.
//!
//! The TOML file is looked up at:
//! - macOS: ~/Library/Application Support/growltalk/config.toml
//! - Linux: ~/.config/growltalk/config.toml
//! - Windows: %APPDATA%/growltalk/config.toml

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{DEFAULT_PORT, DEFAULT_TTL_MS, MAX_TTL_MS, MIN_TTL_MS};

/// Environment variable holding the listen port
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";
/// Environment variable holding the session TTL in milliseconds
pub const ENV_DELETE_TIMER: &str = "DELETE_TIMER";
/// Environment variable holding the proxy address advertised to clients
pub const ENV_PROXY_SERVER_IP: &str = "PROXY_SERVER_IP";
/// Environment variable holding the proxy port advertised to clients
pub const ENV_PROXY_SERVER_PORT: &str = "PROXY_SERVER_PORT";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Session lifetime settings
    pub session: SessionConfig,
    /// Proxy hints handed to browser clients
    pub proxy: ProxyConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port
    pub port: u16,
    /// Bind address
    pub bind: IpAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Session lifetime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session TTL in milliseconds; half of it is both the sweep interval and
    /// the silence a caller is allowed before eviction
    pub ttl_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
        }
    }
}

impl SessionConfig {
    /// TTL clamped to the supported range
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms.clamp(MIN_TTL_MS, MAX_TTL_MS)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms())
    }

    pub fn half_life(&self) -> Duration {
        Duration::from_millis(self.ttl_ms() / 2)
    }
}

/// Proxy hints served on `/env`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub server_ip: Option<String>,
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("Failed to load config from {:?}: {}, using defaults", path, e);
                Self::default()
            }),
            None => {
                debug!("No config directory found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_var(&lookup, ENV_SERVER_PORT) {
            self.server.port = port;
        }
        if let Some(ttl_ms) = parse_var(&lookup, ENV_DELETE_TIMER) {
            self.session.ttl_ms = ttl_ms;
        }
        if let Some(ip) = lookup(ENV_PROXY_SERVER_IP).filter(|v| !v.trim().is_empty()) {
            self.proxy.server_ip = Some(ip.trim().to_string());
        }
        if let Some(port) = parse_var(&lookup, ENV_PROXY_SERVER_PORT) {
            self.proxy.server_port = Some(port);
        }
    }

    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "growltalk", "growltalk")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Generate a sample configuration file content
    pub fn sample() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.session.ttl_ms, 10_000);
        assert_eq!(config.session.half_life(), Duration::from_secs(5));
        assert!(config.proxy.server_ip.is_none());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
            [session]
            ttl_ms = 30000
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.ttl_ms, 30_000);
        // Other values should be defaults
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_ttl_clamped() {
        let session = SessionConfig { ttl_ms: 10 };
        assert_eq!(session.ttl_ms(), MIN_TTL_MS);
        assert_eq!(session.half_life(), Duration::from_millis(MIN_TTL_MS / 2));

        let session = SessionConfig { ttl_ms: u64::MAX };
        assert_eq!(session.ttl_ms(), MAX_TTL_MS);
        assert_eq!(session.ttl(), Duration::from_millis(MAX_TTL_MS));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SERVER_PORT", "8443"),
            ("DELETE_TIMER", "20000"),
            ("PROXY_SERVER_IP", "192.168.1.184"),
            ("PROXY_SERVER_PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8443);
        assert_eq!(config.session.ttl_ms, 20_000);
        assert_eq!(config.proxy.server_ip.as_deref(), Some("192.168.1.184"));
        assert_eq!(config.proxy.server_port, None);
    }

    #[test]
    fn test_sample_config() {
        let sample = Config::sample();
        assert!(sample.contains("[server]"));
        assert!(sample.contains("[session]"));
        assert!(sample.contains("ttl_ms"));
    }

    #[test]
    fn test_config_load_missing() {
        let config = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.server.port, 9999); // Should use defaults
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 7000\n\n[proxy]\nserver_port = 9000").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.proxy.server_port, Some(9000));
        assert_eq!(config.session.ttl_ms, 10_000);
    }

    #[test]
    fn test_config_load_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
