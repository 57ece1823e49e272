use std::str::FromStr;
use std::time::Duration;

use common_kafka::config::{ConsumerConfig, KafkaConfig};
use envconfig::Envconfig;
use thiserror::Error;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3311")]
    pub port: u16,

    #[envconfig(from = "DOG_TOPIC", default = "dogs_topic")]
    pub topic: String,

    #[envconfig(from = "POLL_TIMEOUT_MS", default = "1000")]
    pub poll_timeout_ms: u64,

    #[envconfig(from = "MAX_POLL_RECORDS", default = "100")]
    pub max_poll_records: usize,

    #[envconfig(from = "REPORT_INTERVAL_SECS", default = "30")]
    pub report_interval_secs: u64,

    #[envconfig(from = "MISSING_TOY_POLICY", default = "skip")]
    pub missing_toy_policy: MissingToyPolicy,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(nested = true)]
    pub consumer: ConsumerConfig,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

/// What to do with a well-formed event that names no favorite toy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MissingToyPolicy {
    /// Warn and leave the counts alone.
    #[default]
    Skip,
    /// Warn and count it under `"Unknown"`.
    CountUnknown,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown missing toy policy {0:?}, expected skip or count_unknown")]
pub struct ParseMissingToyPolicyError(String);

impl FromStr for MissingToyPolicy {
    type Err = ParseMissingToyPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(MissingToyPolicy::Skip),
            "count_unknown" => Ok(MissingToyPolicy::CountUnknown),
            _ => Err(ParseMissingToyPolicyError(s.to_owned())),
        }
    }
}
