use dog_common::broker::BrokerError;
use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

/// Errors that end the producer process.
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] envconfig::Error),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] BuildError),
    #[error("kafka is unreachable: {0}")]
    Connectivity(#[source] BrokerError),
    #[error("failed to set up topic {topic}: {source}")]
    TopicSetup {
        topic: String,
        #[source]
        source: BrokerError,
    },
    #[error("stopped on a fatal broker error: {0}")]
    Fatal(#[source] BrokerError),
}

impl ProducerError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ProducerError::Config(_) => 2,
            ProducerError::Connectivity(_) => 3,
            ProducerError::TopicSetup { .. } => 4,
            ProducerError::Metrics(_) | ProducerError::Fatal(_) => 1,
        }
    }
}
