use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use common_kafka::admin::{create_admin_client, ensure_topic, TopicStatus};
use common_kafka::config::{ConsumerConfig, KafkaConfig};
use common_kafka::kafka_consumer::{
    commit_processed, create_kafka_consumer, recv_batch, store_offsets,
};
use common_kafka::kafka_producer::create_kafka_producer;
use common_kafka::KafkaContext;
use health::HealthHandle;
use rdkafka::admin::AdminClient;
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Message, OwnedMessage};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{error, info};

use crate::broker::{BrokerError, EventSink, EventSource, ReceivedMessage, Release};

/// Topic settings the producer applies when it creates the topic.
#[derive(Debug, Clone)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication: i32,
}

pub struct KafkaEventSink {
    producer: FutureProducer<KafkaContext>,
    admin: AdminClient<DefaultClientContext>,
    topic: TopicSpec,
    admin_timeout: Duration,
}

impl KafkaEventSink {
    /// Connects to the brokers. Fails with [`BrokerError::Connectivity`] if
    /// they cannot be reached within the metadata timeout.
    pub fn connect(
        config: &KafkaConfig,
        topic: TopicSpec,
        liveness: HealthHandle,
    ) -> Result<Self, BrokerError> {
        let producer = create_kafka_producer(config, liveness)
            .map_err(|e| BrokerError::Connectivity(e.to_string()))?;
        let admin =
            create_admin_client(config).map_err(|e| BrokerError::Connectivity(e.to_string()))?;

        Ok(Self {
            producer,
            admin,
            topic,
            admin_timeout: config.metadata_timeout(),
        })
    }
}

#[async_trait]
impl EventSink for KafkaEventSink {
    async fn ensure_topic(&self) -> Result<(), BrokerError> {
        let status = ensure_topic(
            &self.admin,
            &self.topic.name,
            self.topic.partitions,
            self.topic.replication,
            self.admin_timeout,
        )
        .await?;

        if status == TopicStatus::AlreadyExists {
            info!(topic = %self.topic.name, "using existing topic");
        }
        Ok(())
    }

    async fn send(&self, payload: &[u8]) -> Result<(), BrokerError> {
        let record = FutureRecord::<str, [u8]>::to(&self.topic.name).payload(payload);

        match self.producer.send(record, Timeout::Never).await {
            Ok(_) => Ok(()),
            Err((error, _message)) => Err(error.into()),
        }
    }
}

impl Release for KafkaEventSink {
    fn release(self) {
        // Blocks until every queued message is delivered or has failed
        info!(topic = %self.topic.name, "flushing producer");
        if let Err(e) = self.producer.flush(Timeout::Never) {
            error!(error = %e, "failed to flush producer, pending messages may be lost");
        }
    }
}

pub struct KafkaEventSource {
    consumer: StreamConsumer<KafkaContext>,
    topic: String,
    // Highest processed offset per partition, committed synchronously on release
    processed: HashMap<i32, i64>,
}

impl KafkaEventSource {
    pub fn connect(
        config: &KafkaConfig,
        consumer_config: &ConsumerConfig,
        topic: &str,
        liveness: HealthHandle,
    ) -> Result<Self, BrokerError> {
        let consumer = create_kafka_consumer(config, consumer_config, topic, liveness)
            .map_err(|e| BrokerError::Connectivity(e.to_string()))?;

        Ok(Self {
            consumer,
            topic: topic.to_owned(),
            processed: HashMap::new(),
        })
    }
}

impl From<OwnedMessage> for ReceivedMessage {
    fn from(message: OwnedMessage) -> Self {
        ReceivedMessage {
            topic: message.topic().to_owned(),
            partition: message.partition(),
            offset: message.offset(),
            timestamp: message.timestamp().to_millis(),
            payload: message.payload().map(|p| p.to_vec()),
        }
    }
}

#[async_trait]
impl EventSource for KafkaEventSource {
    async fn poll(
        &mut self,
        max_wait: Duration,
        max_records: usize,
    ) -> Result<Vec<ReceivedMessage>, BrokerError> {
        let batch = recv_batch(&self.consumer, max_wait, max_records).await?;
        Ok(batch.into_iter().map(ReceivedMessage::from).collect())
    }

    async fn commit(&mut self, messages: &[ReceivedMessage]) -> Result<(), BrokerError> {
        let mut latest: HashMap<i32, i64> = HashMap::new();
        for message in messages {
            let offset = latest.entry(message.partition).or_insert(message.offset);
            *offset = (*offset).max(message.offset);
        }

        store_offsets(&self.consumer, &self.topic, latest.iter().map(|(p, o)| (*p, *o)))?;

        for (partition, offset) in latest {
            let entry = self.processed.entry(partition).or_insert(offset);
            *entry = (*entry).max(offset);
        }
        Ok(())
    }
}

impl Release for KafkaEventSource {
    fn release(self) {
        if let Err(e) = commit_processed(&self.consumer, &self.topic, &self.processed) {
            error!(error = %e, "failed to commit offsets on close, messages may be redelivered");
        }
        self.consumer.unsubscribe();
        info!(topic = %self.topic, "consumer closed");
    }
}
