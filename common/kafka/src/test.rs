use std::time::Duration;

use health::{HealthHandle, HealthRegistry};
use rdkafka::mocking::MockCluster;
use rdkafka::producer::DefaultProducerContext;

use crate::config::{ConsumerConfig, KafkaConfig};

/// Spins up an in-process librdkafka mock cluster with `topic` created and
/// returns configs pointing at it. Keep the cluster alive for the duration
/// of the test: dropping it shuts the brokers down.
pub fn create_mock_kafka(
    topic: &str,
    partitions: i32,
) -> (MockCluster<'static, DefaultProducerContext>, KafkaConfig) {
    let cluster = MockCluster::new(1).expect("failed to create mock brokers");
    cluster
        .create_topic(topic, partitions, 1)
        .expect("failed to create topic on mock brokers");

    let config = KafkaConfig {
        kafka_hosts: cluster.bootstrap_servers(),
        kafka_tls: false,
        kafka_producer_linger_ms: 0,
        kafka_producer_queue_mib: 50,
        kafka_message_timeout_ms: 5000,
        kafka_compression_codec: "none".to_string(),
        kafka_metadata_timeout_ms: 5000,
    };

    (cluster, config)
}

pub fn mock_consumer_config(group: &str) -> ConsumerConfig {
    ConsumerConfig {
        kafka_consumer_group: group.to_string(),
        kafka_consumer_offset_reset: "earliest".to_string(),
        kafka_consumer_auto_commit_interval_ms: 100,
    }
}

pub fn test_liveness(component: &str) -> HealthHandle {
    HealthRegistry::new("liveness").register(component, Duration::from_secs(30))
}
