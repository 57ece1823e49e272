use std::collections::HashMap;
use std::time::Duration;

use health::HealthHandle;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::OwnedMessage;
use rdkafka::{Offset, TopicPartitionList};
use tracing::{debug, error, info, warn};

use crate::config::{ConsumerConfig, KafkaConfig};
use crate::kafka_producer::KafkaContext;

/// Creates a consumer subscribed to a single topic.
///
/// Offsets are never stored automatically: the caller stores them with
/// [`store_offsets`] once a message has been fully processed, and librdkafka
/// commits stored offsets in the background. That gives at-least-once
/// delivery: a crash between processing and commit replays, never skips.
pub fn create_kafka_consumer(
    common_config: &KafkaConfig,
    consumer_config: &ConsumerConfig,
    topic: &str,
    liveness: HealthHandle,
) -> Result<StreamConsumer<KafkaContext>, KafkaError> {
    let mut client_config = common_config.client_config();
    client_config
        .set("group.id", &consumer_config.kafka_consumer_group)
        .set(
            "auto.offset.reset",
            &consumer_config.kafka_consumer_offset_reset,
        )
        .set("enable.auto.commit", "true")
        .set(
            "auto.commit.interval.ms",
            consumer_config
                .kafka_consumer_auto_commit_interval_ms
                .to_string(),
        )
        .set("enable.auto.offset.store", "false");

    debug!("rdkafka consumer configuration: {:?}", client_config);
    let consumer: StreamConsumer<KafkaContext> =
        client_config.create_with_context(liveness.into())?;

    match consumer.fetch_metadata(None, common_config.metadata_timeout()) {
        Ok(metadata) => {
            info!(
                "Successfully connected to Kafka brokers. Found {} topics.",
                metadata.topics().len()
            );
        }
        Err(error) => {
            error!("Failed to fetch metadata from Kafka brokers: {:?}", error);
            return Err(error);
        }
    }

    consumer.subscribe(&[topic])?;
    info!(
        topic,
        group = %consumer_config.kafka_consumer_group,
        "subscribed to topic"
    );

    Ok(consumer)
}

/// Collects up to `max_records` messages, waiting at most `max_wait` in total.
///
/// Returns early with whatever was collected when the deadline passes. An
/// error is only returned if nothing was collected yet, otherwise it is
/// logged and the partial batch is handed back so it still gets processed.
pub async fn recv_batch(
    consumer: &StreamConsumer<KafkaContext>,
    max_wait: Duration,
    max_records: usize,
) -> Result<Vec<OwnedMessage>, KafkaError> {
    let deadline = tokio::time::Instant::now() + max_wait;
    let mut batch = Vec::with_capacity(max_records);

    while batch.len() < max_records {
        match tokio::time::timeout_at(deadline, consumer.recv()).await {
            Err(_elapsed) => break,
            Ok(Ok(message)) => batch.push(message.detach()),
            Ok(Err(KafkaError::PartitionEOF(partition))) => {
                debug!(partition, "reached end of partition");
            }
            Ok(Err(e)) if batch.is_empty() => return Err(e),
            Ok(Err(e)) => {
                warn!(error = %e, collected = batch.len(), "kafka error mid-batch, returning partial batch");
                break;
            }
        }
    }

    Ok(batch)
}

/// Marks each `(partition, offset)` of `topic` as processed.
pub fn store_offsets(
    consumer: &StreamConsumer<KafkaContext>,
    topic: &str,
    offsets: impl IntoIterator<Item = (i32, i64)>,
) -> Result<(), KafkaError> {
    for (partition, offset) in offsets {
        consumer.store_offset(topic, partition, offset)?;
    }
    Ok(())
}

/// Synchronously commits the next offset to read for each partition.
/// `processed` maps partition to the last processed offset.
pub fn commit_processed(
    consumer: &StreamConsumer<KafkaContext>,
    topic: &str,
    processed: &HashMap<i32, i64>,
) -> Result<(), KafkaError> {
    if processed.is_empty() {
        return Ok(());
    }

    let mut list = TopicPartitionList::new();
    for (partition, offset) in processed {
        list.add_partition_offset(topic, *partition, Offset::Offset(offset + 1))?;
    }

    consumer.commit(&list, CommitMode::Sync)?;
    info!(topic, partitions = processed.len(), "committed offsets");
    Ok(())
}
