//! Client configuration: caller options merged over documented defaults
//!
//! [`ClientOptions`] is what a caller hands in; every field is optional so
//! that a single nested value can be overridden. [`ClientOptions::merge`]
//! deep-merges it over the defaults and validates the result into one
//! immutable [`EffectiveConfig`] that lives as long as the client.

use crate::observability::logger::{assert_logger, LogChoice, Logger, Severity};
use crate::transport::address::{AddressError, AmqpAddress, UrlSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_RECONNECT_LIMIT: u32 = 5;
pub const DEFAULT_RECONNECT_TIMEOUT_MS: u64 = 50;
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 1000;

/// Caller-supplied options; unset fields fall back to defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Connection address, either a URL string or a table of parts
    pub url: Option<UrlSpec>,
    #[serde(default)]
    pub reconnect: ReconnectOverrides,
    #[serde(default)]
    pub socket: SocketOverrides,
    #[serde(default)]
    pub assert: AssertOverrides,
    pub log: Option<LogChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconnectOverrides {
    /// Maximum retry attempts before giving up
    pub limit: Option<u32>,
    /// Base backoff delay in milliseconds, doubled per failed attempt
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocketOverrides {
    /// Socket timeout in milliseconds
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertOverrides {
    pub queues: Option<Vec<QueueDecl>>,
    pub exchanges: Option<Vec<ExchangeDecl>>,
    pub binds: Option<Vec<BindDecl>>,
}

/// Queue to provision: a bare name or a name with declaration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueueDecl {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        options: Map<String, Value>,
    },
}

impl QueueDecl {
    pub fn name(&self) -> &str {
        match self {
            QueueDecl::Name(name) => name,
            QueueDecl::Detailed { name, .. } => name,
        }
    }
}

impl From<&str> for QueueDecl {
    fn from(name: &str) -> Self {
        QueueDecl::Name(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDecl {
    pub name: String,
    #[serde(rename = "type", default = "default_exchange_kind")]
    pub kind: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

fn default_exchange_kind() -> String {
    "topic".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindDecl {
    pub queue: String,
    pub exchange: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Effective reconnect policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconnectPolicy {
    pub limit: u32,
    pub timeout_ms: u64,
}

impl ReconnectPolicy {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Socket options handed to the raw connect primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SocketOptions {
    pub timeout_ms: u64,
}

impl SocketOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SOCKET_TIMEOUT_MS,
        }
    }
}

/// Declarative resource lists, passed verbatim to the resource asserter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssertSpec {
    pub queues: Vec<QueueDecl>,
    pub exchanges: Vec<ExchangeDecl>,
    pub binds: Vec<BindDecl>,
}

impl AssertSpec {
    /// Whether any resource is configured for assertion
    pub fn has_work(&self) -> bool {
        !(self.queues.is_empty() && self.exchanges.is_empty() && self.binds.is_empty())
    }
}

/// Immutable configuration produced by [`ClientOptions::merge`]
#[derive(Clone, Serialize)]
pub struct EffectiveConfig {
    pub url: AmqpAddress,
    pub reconnect: ReconnectPolicy,
    pub socket: SocketOptions,
    pub assert: AssertSpec,
    #[serde(skip)]
    pub log: Arc<dyn Logger>,
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("url", &self.url.to_string())
            .field("reconnect", &self.reconnect)
            .field("socket", &self.socket)
            .field("assert", &self.assert)
            .finish_non_exhaustive()
    }
}

/// Configuration errors, all raised at construction time
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    #[error(
        "Invalid logger passed, must provide every log level (fatal, error, warn, info, debug, trace) - missing `{missing}()`"
    )]
    InvalidLogger { missing: Severity },
    #[error("Resource assertion is configured but no resource asserter was supplied")]
    MissingAsserter,
}

impl From<&str> for ClientOptions {
    fn from(url: &str) -> Self {
        Self {
            url: Some(UrlSpec::from(url)),
            ..Default::default()
        }
    }
}

impl From<String> for ClientOptions {
    fn from(url: String) -> Self {
        Self {
            url: Some(UrlSpec::from(url)),
            ..Default::default()
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<UrlSpec>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_reconnect_limit(mut self, limit: u32) -> Self {
        self.reconnect.limit = Some(limit);
        self
    }

    pub fn with_reconnect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.reconnect.timeout = Some(timeout_ms);
        self
    }

    pub fn with_socket_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.socket.timeout = Some(timeout_ms);
        self
    }

    pub fn with_queues<I, Q>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<QueueDecl>,
    {
        self.assert.queues = Some(queues.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_exchanges(mut self, exchanges: Vec<ExchangeDecl>) -> Self {
        self.assert.exchanges = Some(exchanges);
        self
    }

    pub fn with_binds(mut self, binds: Vec<BindDecl>) -> Self {
        self.assert.binds = Some(binds);
        self
    }

    pub fn with_log(mut self, log: impl Into<LogChoice>) -> Self {
        self.log = Some(log.into());
        self
    }

    /// Load options from a TOML file using the same option tree
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let options: ClientOptions = toml::from_str(&content)?;
        Ok(options)
    }

    /// Apply `AMQP_*` environment variable overrides
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("AMQP_URL") {
            self.url = Some(UrlSpec::Text(url));
        }
        if let Some(limit) = parse_env(&lookup, "AMQP_RECONNECT_LIMIT")? {
            self.reconnect.limit = Some(limit);
        }
        if let Some(timeout) = parse_env(&lookup, "AMQP_RECONNECT_TIMEOUT_MS")? {
            self.reconnect.timeout = Some(timeout);
        }
        if let Some(timeout) = parse_env(&lookup, "AMQP_SOCKET_TIMEOUT_MS")? {
            self.socket.timeout = Some(timeout);
        }
        Ok(self)
    }

    /// Merge over the defaults and validate address and logger
    pub fn merge(self) -> Result<EffectiveConfig, ConfigError> {
        let url = AmqpAddress::normalize(&self.url.unwrap_or_default())?;
        let log = assert_logger(self.log.unwrap_or_default())?;

        Ok(EffectiveConfig {
            url,
            reconnect: ReconnectPolicy {
                limit: self.reconnect.limit.unwrap_or(DEFAULT_RECONNECT_LIMIT),
                timeout_ms: self
                    .reconnect
                    .timeout
                    .unwrap_or(DEFAULT_RECONNECT_TIMEOUT_MS),
            },
            socket: SocketOptions {
                timeout_ms: self.socket.timeout.unwrap_or(DEFAULT_SOCKET_TIMEOUT_MS),
            },
            assert: AssertSpec {
                queues: self.assert.queues.unwrap_or_default(),
                exchanges: self.assert.exchanges.unwrap_or_default(),
                binds: self.assert.binds.unwrap_or_default(),
            },
            log,
        })
    }
}

fn parse_env<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                ConfigError::InvalidConfig(format!("{name} must be a number, got '{raw}'"))
            })
        })
        .transpose()
}
