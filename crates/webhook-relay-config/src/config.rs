// crates/webhook-relay-config/src/config.rs
// ============================================================================
// Module: Relay Configuration
// Description: Configuration model, layering, and validation for the relay.
// Purpose: Resolve broker, HTTP, registry, forwarder, and log settings.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is read from a TOML file and overridden by environment
//! variables; every key has a built-in default, so both the file and the
//! variables are optional. A missing file at the default location degrades
//! to defaults; an explicitly named but unreadable file is an error.
//!
//! # Invariants
//! - Layering priority is environment variable > config file > default.
//! - Validation runs on the fully layered result; invalid override values
//!   are errors, never silently ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default config file name resolved against the working directory.
const DEFAULT_CONFIG_NAME: &str = "webhook-relay.toml";
/// Environment variable naming the config file path.
pub(crate) const CONFIG_ENV_VAR: &str = "WEBHOOK_RELAY_CONFIG";
/// Maximum accepted config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum accepted forward timeout (ms).
pub(crate) const MIN_FORWARD_TIMEOUT_MS: u64 = 100;
/// Maximum accepted forward timeout (ms).
pub(crate) const MAX_FORWARD_TIMEOUT_MS: u64 = 600_000;

/// Environment variable overriding `broker.url`.
pub const BROKER_URL_ENV_VAR: &str = "WEBHOOK_RELAY_BROKER_URL";
/// Environment variable overriding `http.port`.
pub const HTTP_PORT_ENV_VAR: &str = "WEBHOOK_RELAY_HTTP_PORT";
/// Environment variable overriding `http.bind`.
pub const HTTP_BIND_ENV_VAR: &str = "WEBHOOK_RELAY_HTTP_BIND";
/// Environment variable overriding `registry.snapshot_path`.
pub const SNAPSHOT_PATH_ENV_VAR: &str = "WEBHOOK_RELAY_SNAPSHOT_PATH";
/// Environment variable overriding `forwarder.timeout_ms`.
pub const FORWARD_TIMEOUT_ENV_VAR: &str = "WEBHOOK_RELAY_FORWARD_TIMEOUT_MS";
/// Environment variable overriding `log.level`.
pub const LOG_LEVEL_ENV_VAR: &str = "WEBHOOK_RELAY_LOG_LEVEL";

/// Override variables recognized by [`RelayConfig::load`].
const OVERRIDE_ENV_VARS: [&str; 6] = [
    BROKER_URL_ENV_VAR,
    HTTP_PORT_ENV_VAR,
    HTTP_BIND_ENV_VAR,
    SNAPSHOT_PATH_ENV_VAR,
    FORWARD_TIMEOUT_ENV_VAR,
    LOG_LEVEL_ENV_VAR,
];

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    /// Broker connection configuration.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// HTTP control-plane configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Enrollment registry persistence configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Webhook forwarder configuration.
    #[serde(default)]
    pub forwarder: ForwarderConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

impl RelayConfig {
    /// Loads configuration from disk and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, layering, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(&process_env_overrides()?)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the config file layer, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable or malformed. A
    /// missing file is an error only when the path was given explicitly.
    pub fn from_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if !explicit && err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies override variables as name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value fails to parse or a name is not
    /// a recognized override variable.
    pub fn apply_overrides(&mut self, overrides: &[(String, String)]) -> Result<(), ConfigError> {
        for (name, value) in overrides {
            match name.as_str() {
                BROKER_URL_ENV_VAR => self.broker.url = value.clone(),
                HTTP_PORT_ENV_VAR => {
                    self.http.port = value.parse().map_err(|_| {
                        ConfigError::Invalid(format!("{HTTP_PORT_ENV_VAR} must be a port number"))
                    })?;
                }
                HTTP_BIND_ENV_VAR => self.http.bind = value.clone(),
                SNAPSHOT_PATH_ENV_VAR => {
                    self.registry.snapshot_path = PathBuf::from(value.clone());
                }
                FORWARD_TIMEOUT_ENV_VAR => {
                    self.forwarder.timeout_ms = value.parse().map_err(|_| {
                        ConfigError::Invalid(format!(
                            "{FORWARD_TIMEOUT_ENV_VAR} must be a millisecond count"
                        ))
                    })?;
                }
                LOG_LEVEL_ENV_VAR => self.log.level = parse_log_level(value)?,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "unknown override variable {other}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validates the fully layered configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker.validate()?;
        self.http.validate()?;
        self.registry.validate()?;
        self.forwarder.validate()?;
        Ok(())
    }

    /// Returns the socket address the HTTP listener binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address does not parse.
    pub fn http_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .http
            .bind
            .parse()
            .map_err(|_| ConfigError::Invalid("http bind address must be an ip".to_string()))?;
        Ok(SocketAddr::new(ip, self.http.port))
    }

    /// Returns the bounded forward timeout as a [`Duration`].
    #[must_use]
    pub const fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forwarder.timeout_ms)
    }
}

/// Broker connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Broker URL every consumer connects to.
    #[serde(default = "default_broker_url")]
    pub url: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
        }
    }
}

impl BrokerConfig {
    /// Validates broker configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Invalid("broker url must not be empty".to_string()));
        }
        Ok(())
    }
}

/// HTTP control-plane configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Listener port.
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Listener bind address.
    #[serde(default = "default_http_bind")]
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            bind: default_http_bind(),
        }
    }
}

impl HttpConfig {
    /// Validates HTTP listener configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("http port must be non-zero".to_string()));
        }
        if self.bind.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Invalid("http bind address must be an ip".to_string()));
        }
        Ok(())
    }
}

/// Enrollment registry persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Path of the registry snapshot file.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl RegistryConfig {
    /// Validates registry persistence configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "registry snapshot path must not be empty".to_string(),
            ));
        }
        validate_path(&self.snapshot_path)
    }
}

/// Webhook forwarder configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwarderConfig {
    /// Bounded per-request timeout in milliseconds.
    #[serde(default = "default_forward_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_forward_timeout_ms(),
        }
    }
}

impl ForwarderConfig {
    /// Validates forwarder configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_FORWARD_TIMEOUT_MS..=MAX_FORWARD_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "forward timeout must be between {MIN_FORWARD_TIMEOUT_MS} and {MAX_FORWARD_TIMEOUT_MS} ms"
            )));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Minimum level emitted by the relay.
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Operational messages (default).
    Info,
    /// Per-message detail.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    /// Returns the lowercase level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// The second element is true when the path was named explicitly, which
/// makes a missing file an error rather than a fall-through to defaults.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Collects recognized override variables from the process environment.
fn process_env_overrides() -> Result<Vec<(String, String)>, ConfigError> {
    let mut overrides = Vec::new();
    for name in OVERRIDE_ENV_VARS {
        match env::var(name) {
            Ok(value) => overrides.push((name.to_string(), value)),
            Err(env::VarError::NotPresent) => {}
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigError::Invalid(format!("{name} must be valid unicode")));
            }
        }
    }
    Ok(overrides)
}

/// Parses a log level name as used in override variables.
fn parse_log_level(value: &str) -> Result<LogLevel, ConfigError> {
    match value {
        "error" => Ok(LogLevel::Error),
        "warn" => Ok(LogLevel::Warn),
        "info" => Ok(LogLevel::Info),
        "debug" => Ok(LogLevel::Debug),
        "trace" => Ok(LogLevel::Trace),
        other => Err(ConfigError::Invalid(format!("unknown log level {other}"))),
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default broker URL (the in-process broker).
fn default_broker_url() -> String {
    "mem://local".to_string()
}

/// Returns the default HTTP listener port.
const fn default_http_port() -> u16 {
    8080
}

/// Returns the default HTTP bind address.
fn default_http_bind() -> String {
    "127.0.0.1".to_string()
}

/// Returns the default registry snapshot path.
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("webhook-relay.sqlite")
}

/// Returns the default forward timeout in milliseconds.
const fn default_forward_timeout_ms() -> u64 {
    5_000
}

/// Returns the default log level.
const fn default_log_level() -> LogLevel {
    LogLevel::Info
}
