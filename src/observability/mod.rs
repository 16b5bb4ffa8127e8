//! Observability: pluggable client logger and tracing subscriber setup

pub mod logger;
pub mod logging;

pub use logger::{assert_logger, LogChoice, LogSinks, Logger, NoopLogger, Severity, TracingLogger};
pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{connect_span, lifecycle_span};
