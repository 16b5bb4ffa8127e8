//! Mock implementations for testing
//!
//! Provides a scriptable transport, connection, channel and resource asserter
//! plus a recording logger, so the lifecycle can be exercised without a
//! broker. Mock state lives behind `Arc`s; clone a mock before handing it to
//! a client to keep an inspection handle.

use crate::config::{AssertSpec, SocketOptions};
use crate::observability::logger::{Logger, Severity};
use crate::transport::{AmqpAddress, Channel, Connection, ResourceAsserter, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tokio::time::Instant;

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted result of one mocked operation
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed,
    Fail(String),
    /// Wait for the notify, then resolve to the inner outcome
    Gated(Arc<Notify>, Box<Outcome>),
}

impl Outcome {
    async fn resolve(self) -> Result<(), TransportError> {
        let mut outcome = self;
        loop {
            match outcome {
                Outcome::Succeed => return Ok(()),
                Outcome::Fail(message) => return Err(TransportError::new(message)),
                Outcome::Gated(gate, inner) => {
                    gate.notified().await;
                    outcome = *inner;
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct TransportState {
    connect_script: Mutex<VecDeque<Outcome>>,
    channel_script: Mutex<VecDeque<Outcome>>,
    connect_times: Mutex<Vec<Instant>>,
    addresses: Mutex<Vec<AmqpAddress>>,
    socket_options: Mutex<Vec<SocketOptions>>,
    connect_calls: AtomicUsize,
    create_channel_calls: AtomicUsize,
    connection_closes: AtomicUsize,
    channel_closes: AtomicUsize,
}

/// Mock transport; unscripted operations succeed
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<TransportState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose first `count` connect attempts fail
    pub fn failing_connects(count: usize, message: &str) -> Self {
        let transport = Self::new();
        for _ in 0..count {
            transport.script_connect(Outcome::Fail(message.to_string()));
        }
        transport
    }

    pub fn script_connect(&self, outcome: Outcome) {
        locked(&self.state.connect_script).push_back(outcome);
    }

    pub fn script_channel(&self, outcome: Outcome) {
        locked(&self.state.channel_script).push_back(outcome);
    }

    /// Hold the next connect until the returned notify fires, then succeed
    pub fn hold_next_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script_connect(Outcome::Gated(Arc::clone(&gate), Box::new(Outcome::Succeed)));
        gate
    }

    /// Hold the next channel creation until the returned notify fires, then succeed
    pub fn hold_next_channel(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script_channel(Outcome::Gated(Arc::clone(&gate), Box::new(Outcome::Succeed)));
        gate
    }

    pub fn connect_calls(&self) -> usize {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub fn create_channel_calls(&self) -> usize {
        self.state.create_channel_calls.load(Ordering::SeqCst)
    }

    pub fn connection_closes(&self) -> usize {
        self.state.connection_closes.load(Ordering::SeqCst)
    }

    pub fn channel_closes(&self) -> usize {
        self.state.channel_closes.load(Ordering::SeqCst)
    }

    /// Instants at which connect attempts started
    pub fn connect_times(&self) -> Vec<Instant> {
        locked(&self.state.connect_times).clone()
    }

    pub fn addresses(&self) -> Vec<AmqpAddress> {
        locked(&self.state.addresses).clone()
    }

    pub fn socket_options(&self) -> Vec<SocketOptions> {
        locked(&self.state.socket_options).clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Connection = MockConnection;
    type Channel = MockChannel;

    async fn connect(
        &self,
        address: &AmqpAddress,
        socket: &SocketOptions,
    ) -> Result<Self::Connection, TransportError> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        locked(&self.state.connect_times).push(Instant::now());
        locked(&self.state.addresses).push(address.clone());
        locked(&self.state.socket_options).push(*socket);

        let outcome = locked(&self.state.connect_script)
            .pop_front()
            .unwrap_or(Outcome::Succeed);
        outcome.resolve().await?;

        Ok(MockConnection {
            state: Arc::clone(&self.state),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }
}

/// Connection handed out by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct MockConnection {
    state: Arc<TransportState>,
    closed: Arc<AtomicUsize>,
}

impl MockConnection {
    /// Times this particular connection was closed
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    type Channel = MockChannel;

    async fn create_channel(&self) -> Result<Self::Channel, TransportError> {
        self.state.create_channel_calls.fetch_add(1, Ordering::SeqCst);

        let outcome = locked(&self.state.channel_script)
            .pop_front()
            .unwrap_or(Outcome::Succeed);
        outcome.resolve().await?;

        Ok(MockChannel {
            state: Arc::clone(&self.state),
            id: self.state.create_channel_calls.load(Ordering::SeqCst),
        })
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.state.connection_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Channel handed out by [`MockConnection`]
#[derive(Debug, Clone)]
pub struct MockChannel {
    state: Arc<TransportState>,
    id: usize,
}

impl MockChannel {
    /// Sequence number of the channel, starting at 1
    pub fn id(&self) -> usize {
        self.id
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn close(&self) -> Result<(), TransportError> {
        self.state.channel_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Resource asserter recording every request
#[derive(Debug, Clone, Default)]
pub struct MockAsserter {
    calls: Arc<Mutex<Vec<AssertSpec>>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
    failure: Option<String>,
}

impl MockAsserter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Hold the next assertion until the returned notify fires
    pub fn hold_next(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *locked(&self.gate) = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<AssertSpec> {
        locked(&self.calls).clone()
    }
}

#[async_trait]
impl ResourceAsserter<MockChannel> for MockAsserter {
    async fn assert_resources(
        &self,
        _channel: &MockChannel,
        spec: &AssertSpec,
    ) -> Result<(), TransportError> {
        locked(&self.calls).push(spec.clone());
        let gate = locked(&self.gate).take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match &self.failure {
            Some(message) => Err(TransportError::new(message.clone())),
            None => Ok(()),
        }
    }
}

/// Logger keeping every line it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    lines: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Severity, String)> {
        locked(&self.lines).clone()
    }

    pub fn messages_at(&self, severity: Severity) -> Vec<String> {
        locked(&self.lines)
            .iter()
            .filter(|(level, _)| *level == severity)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        locked(&self.lines)
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

impl Logger for RecordingLogger {
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
        locked(&self.lines).push((severity, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::UrlSpec;

    fn localhost() -> AmqpAddress {
        AmqpAddress::normalize(&UrlSpec::default()).unwrap()
    }

    #[tokio::test]
    async fn test_mock_transport_follows_script_then_succeeds() {
        let transport = MockTransport::failing_connects(1, "refused");
        let socket = SocketOptions::default();

        let first = transport.connect(&localhost(), &socket).await;
        let second = transport.connect(&localhost(), &socket).await;

        assert_eq!(first.unwrap_err().message(), "refused");
        assert!(second.is_ok());
        assert_eq!(transport.connect_calls(), 2);
        assert_eq!(transport.addresses()[0].hostname, "localhost");
    }

    #[tokio::test]
    async fn test_mock_channels_are_numbered() {
        let transport = MockTransport::new();
        let connection = transport
            .connect(&localhost(), &SocketOptions::default())
            .await
            .unwrap();

        let first = connection.create_channel().await.unwrap();
        let second = connection.create_channel().await.unwrap();

        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
    }

    #[test]
    fn test_recording_logger_filters_by_severity() {
        let logger = RecordingLogger::new();
        logger.warn("slow");
        logger.error("broken");

        assert_eq!(logger.messages_at(Severity::Error), vec!["broken"]);
        assert!(logger.contains("slow"));
        assert_eq!(logger.lines().len(), 2);
    }
}
