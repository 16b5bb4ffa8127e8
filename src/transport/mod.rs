//! Transport abstraction for AMQP connection bootstrap
//!
//! The lifecycle manager never speaks the wire protocol itself. It drives
//! these traits, which a protocol library (see [`lapin_transport`]) or a test
//! double implements. This enables dependency injection and testing without a
//! broker.

use crate::config::{AssertSpec, SocketOptions};
use async_trait::async_trait;
use std::fmt;

pub mod address;
pub mod lapin_transport;

pub use address::{AddressError, AddressParts, AmqpAddress, UrlSpec};
pub use lapin_transport::LapinTransport;

/// Error reported by a transport collaborator
///
/// Carries the message shown to callers plus the underlying error, if any.
#[derive(Debug)]
pub struct TransportError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying library error, reusing its display text
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Raw connect primitive
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection<Channel = Self::Channel>;
    type Channel: Channel;

    /// Open a raw connection to the broker at `address`
    async fn connect(
        &self,
        address: &AmqpAddress,
        socket: &SocketOptions,
    ) -> Result<Self::Connection, TransportError>;
}

/// A live raw connection owned by the protocol library
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    type Channel: Channel;

    /// Open a new channel multiplexed over this connection
    async fn create_channel(&self) -> Result<Self::Channel, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// A live channel handle; cheap to clone, shared with ready-listeners
#[async_trait]
pub trait Channel: Clone + Send + Sync + 'static {
    async fn close(&self) -> Result<(), TransportError>;
}

/// Resource assertion gateway
///
/// Given an open channel and the declarative resource lists, provisions them
/// and reports success or failure. The lifecycle manager only waits on it.
#[async_trait]
pub trait ResourceAsserter<C: Channel>: Send + Sync + 'static {
    async fn assert_resources(&self, channel: &C, spec: &AssertSpec) -> Result<(), TransportError>;
}
