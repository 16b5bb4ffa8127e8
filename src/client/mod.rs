//! Connection lifecycle management
//!
//! A [`Client`] turns a configuration into a live connection plus channel.
//! It retries failed connects with exponential backoff up to a limit, hands
//! the channel to an optional resource asserter and then signals readiness.
//! Readiness goes to queued ready-listeners and to exactly one completion
//! callback. [`Client::close`] stops everything, including a pending retry.
//!
//! - [`connection`] holds the pure state and retry decision
//! - [`listeners`] is the ready-listener queue
//! - [`completion`] is the one-shot completion wrapper
//! - [`lifecycle`] drives the transport

pub mod completion;
pub mod connection;
pub mod lifecycle;
pub mod listeners;

pub use completion::{completion_channel, Completion};
pub use connection::{ConnectionState, LifecyclePhase, ReconnectDecision};
pub use lifecycle::{Client, ClientBuilder, Ready};
pub use listeners::ReadyListeners;
