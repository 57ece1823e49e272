//! Seam between the service loops and the message broker.
//!
//! The loops only see [`EventSink`] and [`EventSource`], so they run the same
//! against Kafka (see [`crate::kafka`]) and the in-memory broker used in tests
//! (see [`crate::test_utils`]).

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::error::KafkaError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Brokers could not be reached at startup.
    #[error("failed to connect to brokers: {0}")]
    Connectivity(String),
    /// A single operation failed, the client is still usable.
    #[error("transient broker error: {0}")]
    Transient(String),
    /// The client cannot make progress anymore (auth, config, fenced).
    #[error("fatal broker error: {0}")]
    Fatal(String),
}

impl BrokerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrokerError::Fatal(_))
    }
}

impl From<KafkaError> for BrokerError {
    fn from(error: KafkaError) -> Self {
        if common_kafka::errors::is_fatal(&error) {
            BrokerError::Fatal(error.to_string())
        } else {
            BrokerError::Transient(error.to_string())
        }
    }
}

/// A message as handed to the consumer loop. The payload is kept raw so the
/// loop decides what to do with bodies it cannot decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: Option<i64>,
    pub payload: Option<Vec<u8>>,
}

/// Scoped resources with a single, explicit teardown. Wrapped in
/// [`crate::lifecycle::ReleaseGuard`] this runs exactly once on every exit path.
pub trait Release {
    fn release(self);
}

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Create-if-absent. An existing topic is not an error.
    async fn ensure_topic(&self) -> Result<(), BrokerError>;

    /// Publishes one body. Resolves once the broker acknowledged it.
    async fn send(&self, payload: &[u8]) -> Result<(), BrokerError>;
}

#[async_trait]
pub trait EventSource: Send {
    /// Waits up to `max_wait` for up to `max_records` messages. An empty batch
    /// just means nothing arrived in time.
    async fn poll(
        &mut self,
        max_wait: Duration,
        max_records: usize,
    ) -> Result<Vec<ReceivedMessage>, BrokerError>;

    /// Marks `messages` as processed for the consumer group.
    async fn commit(&mut self, messages: &[ReceivedMessage]) -> Result<(), BrokerError>;
}
