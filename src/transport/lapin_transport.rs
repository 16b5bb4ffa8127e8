//! lapin-backed transport
//!
//! Wraps `lapin::Connection` and `lapin::Channel` behind the transport traits.
//! Resource provisioning is not done here; pair the client with a
//! [`ResourceAsserter`](super::ResourceAsserter) of your own when queues or
//! exchanges must be declared.

use super::{AmqpAddress, Channel, Connection, Transport, TransportError};
use crate::config::SocketOptions;
use async_trait::async_trait;
use lapin::ConnectionProperties;
use tracing::debug;

const CLOSE_REPLY_CODE: u16 = 200;
const CLOSE_REPLY_TEXT: &str = "Bye";

/// Transport opening real broker connections through lapin
#[derive(Debug, Clone, Default)]
pub struct LapinTransport {
    connection_name: Option<String>,
}

impl LapinTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name reported to the broker in the client properties
    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = Some(name.into());
        self
    }

    fn properties(&self) -> ConnectionProperties {
        let properties = ConnectionProperties::default();
        match &self.connection_name {
            Some(name) => properties.with_connection_name(name.clone().into()),
            None => properties,
        }
    }
}

#[async_trait]
impl Transport for LapinTransport {
    type Connection = LapinConnection;
    type Channel = LapinChannel;

    async fn connect(
        &self,
        address: &AmqpAddress,
        socket: &SocketOptions,
    ) -> Result<Self::Connection, TransportError> {
        debug!(address = %address, timeout_ms = socket.timeout_ms, "Opening AMQP connection");

        let uri = address.to_uri();
        let connect = lapin::Connection::connect(&uri, self.properties());

        match tokio::time::timeout(socket.timeout(), connect).await {
            Ok(Ok(connection)) => Ok(LapinConnection { inner: connection }),
            Ok(Err(error)) => Err(TransportError::from_source(error)),
            Err(_) => Err(TransportError::new(format!(
                "connect timed out after {} ms",
                socket.timeout_ms
            ))),
        }
    }
}

/// Live lapin connection
pub struct LapinConnection {
    inner: lapin::Connection,
}

impl LapinConnection {
    pub fn inner(&self) -> &lapin::Connection {
        &self.inner
    }
}

#[async_trait]
impl Connection for LapinConnection {
    type Channel = LapinChannel;

    async fn create_channel(&self) -> Result<Self::Channel, TransportError> {
        self.inner
            .create_channel()
            .await
            .map(LapinChannel)
            .map_err(TransportError::from_source)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner
            .close(CLOSE_REPLY_CODE, CLOSE_REPLY_TEXT)
            .await
            .map_err(TransportError::from_source)
    }
}

/// Live lapin channel
#[derive(Clone)]
pub struct LapinChannel(lapin::Channel);

impl LapinChannel {
    pub fn inner(&self) -> &lapin::Channel {
        &self.0
    }
}

#[async_trait]
impl Channel for LapinChannel {
    async fn close(&self) -> Result<(), TransportError> {
        self.0
            .close(CLOSE_REPLY_CODE, CLOSE_REPLY_TEXT)
            .await
            .map_err(TransportError::from_source)
    }
}
