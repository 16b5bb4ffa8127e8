//! Six-level logger contract used for operational narration
//!
//! The client narrates through a [`Logger`] rather than calling `tracing`
//! directly so that callers can route connection chatter wherever they like.
//! Loggers assembled at runtime from per-level handlers ([`LogSinks`]) are
//! checked once, at construction, by [`assert_logger`].

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Log severities, in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Fatal,
        Severity::Error,
        Severity::Warn,
        Severity::Info,
        Severity::Debug,
        Severity::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Fatal => "fatal",
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
            Severity::Debug => "debug",
            Severity::Trace => "trace",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leveled logging calls the client relies on
pub trait Logger: Send + Sync {
    fn fatal(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn trace(&self, message: &str);

    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Fatal => self.fatal(message),
            Severity::Error => self.error(message),
            Severity::Warn => self.warn(message),
            Severity::Info => self.info(message),
            Severity::Debug => self.debug(message),
            Severity::Trace => self.trace(message),
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn fatal(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
    fn trace(&self, _message: &str) {}
}

/// Forwards to `tracing`; silent until a subscriber is installed
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn fatal(&self, message: &str) {
        tracing::error!(target: "amqp_tether", fatal = true, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "amqp_tether", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "amqp_tether", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "amqp_tether", "{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "amqp_tether", "{}", message);
    }

    fn trace(&self, message: &str) {
        tracing::trace!(target: "amqp_tether", "{}", message);
    }
}

pub type Sink = Arc<dyn Fn(&str) + Send + Sync>;

/// Logger assembled from per-severity handlers
///
/// Nothing stops a caller from leaving a level out, so it has to pass
/// [`assert_logger`] before the client will use it.
#[derive(Clone, Default)]
pub struct LogSinks {
    sinks: HashMap<Severity, Sink>,
}

impl LogSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, severity: Severity, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.sinks.insert(severity, Arc::new(sink));
        self
    }

    /// Route every severity through one handler
    pub fn all<F>(sink: F) -> Self
    where
        F: Fn(Severity, &str) + Send + Sync + 'static,
    {
        let sink = Arc::new(sink);
        Severity::ALL.iter().fold(Self::new(), |sinks, &severity| {
            let sink = Arc::clone(&sink);
            sinks.on(severity, move |message| sink(severity, message))
        })
    }

    pub fn without(mut self, severity: Severity) -> Self {
        self.sinks.remove(&severity);
        self
    }

    fn first_missing(&self) -> Option<Severity> {
        Severity::ALL
            .into_iter()
            .find(|severity| !self.sinks.contains_key(severity))
    }
}

impl fmt::Debug for LogSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut levels: Vec<_> = self.sinks.keys().map(Severity::as_str).collect();
        levels.sort_unstable();
        f.debug_struct("LogSinks").field("levels", &levels).finish()
    }
}

impl Logger for LogSinks {
    fn fatal(&self, message: &str) {
        self.log(Severity::Fatal, message);
    }
    fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }
    fn warn(&self, message: &str) {
        self.log(Severity::Warn, message);
    }
    fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }
    fn debug(&self, message: &str) {
        self.log(Severity::Debug, message);
    }
    fn trace(&self, message: &str) {
        self.log(Severity::Trace, message);
    }

    fn log(&self, severity: Severity, message: &str) {
        if let Some(sink) = self.sinks.get(&severity) {
            sink(message);
        }
    }
}

/// Which logger the client narrates through; silent unless chosen otherwise
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogChoice {
    /// Opt-in narration through `tracing` events
    Tracing,
    #[default]
    Noop,
    #[serde(skip)]
    Custom(Arc<dyn Logger>),
    #[serde(skip)]
    Sinks(LogSinks),
}

impl fmt::Debug for LogChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogChoice::Tracing => f.write_str("Tracing"),
            LogChoice::Noop => f.write_str("Noop"),
            LogChoice::Custom(_) => f.write_str("Custom(..)"),
            LogChoice::Sinks(sinks) => f.debug_tuple("Sinks").field(sinks).finish(),
        }
    }
}

impl<L: Logger + 'static> From<Arc<L>> for LogChoice {
    fn from(logger: Arc<L>) -> Self {
        LogChoice::Custom(logger)
    }
}

impl From<LogSinks> for LogChoice {
    fn from(sinks: LogSinks) -> Self {
        LogChoice::Sinks(sinks)
    }
}

/// Validate a logger choice, naming the first missing severity on failure
pub fn assert_logger(choice: LogChoice) -> Result<Arc<dyn Logger>, ConfigError> {
    match choice {
        LogChoice::Tracing => Ok(Arc::new(TracingLogger)),
        LogChoice::Noop => Ok(Arc::new(NoopLogger)),
        LogChoice::Custom(logger) => Ok(logger),
        LogChoice::Sinks(sinks) => match sinks.first_missing() {
            Some(missing) => Err(ConfigError::InvalidLogger { missing }),
            None => Ok(Arc::new(sinks)),
        },
    }
}

/// Logger wrapper that never lets a misbehaving logger disturb the caller
#[derive(Clone)]
pub(crate) struct GuardedLogger(Arc<dyn Logger>);

impl GuardedLogger {
    pub(crate) fn new(logger: Arc<dyn Logger>) -> Self {
        Self(logger)
    }

    pub(crate) fn emit(&self, severity: Severity, message: impl AsRef<str>) {
        let logger = &self.0;
        let message = message.as_ref();
        let _ = catch_unwind(AssertUnwindSafe(|| logger.log(severity, message)));
    }

    pub(crate) fn error(&self, message: impl AsRef<str>) {
        self.emit(Severity::Error, message);
    }

    pub(crate) fn warn(&self, message: impl AsRef<str>) {
        self.emit(Severity::Warn, message);
    }

    pub(crate) fn info(&self, message: impl AsRef<str>) {
        self.emit(Severity::Info, message);
    }

    pub(crate) fn debug(&self, message: impl AsRef<str>) {
        self.emit(Severity::Debug, message);
    }
}
