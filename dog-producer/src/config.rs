use std::time::Duration;

use common_kafka::config::KafkaConfig;
use dog_common::kafka::TopicSpec;
use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3310")]
    pub port: u16,

    #[envconfig(from = "DOG_TOPIC", default = "dogs_topic")]
    pub topic: String,

    #[envconfig(from = "DOG_INTERVAL_SECONDS", default = "4")]
    pub interval_seconds: u64,

    #[envconfig(from = "DOG_TOPIC_PARTITIONS", default = "1")]
    pub topic_partitions: i32,

    #[envconfig(from = "DOG_TOPIC_REPLICATION", default = "1")]
    pub topic_replication: i32,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn topic_spec(&self) -> TopicSpec {
        TopicSpec {
            name: self.topic.clone(),
            partitions: self.topic_partitions,
            replication: self.topic_replication,
        }
    }
}
