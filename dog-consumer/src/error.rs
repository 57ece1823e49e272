use dog_common::broker::BrokerError;
use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

/// Errors that end the consumer process.
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] envconfig::Error),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] BuildError),
    #[error("kafka is unreachable: {0}")]
    Connectivity(#[source] BrokerError),
    #[error("stopped on a fatal broker error: {0}")]
    Fatal(#[source] BrokerError),
}

impl ConsumerError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ConsumerError::Config(_) => 2,
            ConsumerError::Connectivity(_) => 3,
            ConsumerError::Metrics(_) | ConsumerError::Fatal(_) => 1,
        }
    }
}
