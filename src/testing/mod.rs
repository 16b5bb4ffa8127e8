//! Testing utilities and mock implementations
//!
//! Mock transport collaborators for exercising the connection lifecycle
//! without a running AMQP broker.

pub mod mocks;

pub use mocks::*;
