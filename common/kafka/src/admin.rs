use std::time::Duration;

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use tracing::{debug, info};

use crate::config::KafkaConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    Created,
    AlreadyExists,
}

pub fn create_admin_client(
    config: &KafkaConfig,
) -> Result<AdminClient<DefaultClientContext>, KafkaError> {
    let client_config = config.client_config();
    debug!("rdkafka admin configuration: {:?}", client_config);
    client_config.create()
}

/// Create-if-absent. A topic that already exists is a success, whatever its
/// partition count, so calling this on every startup is safe.
pub async fn ensure_topic(
    admin: &AdminClient<DefaultClientContext>,
    topic: &str,
    partitions: i32,
    replication: i32,
    timeout: Duration,
) -> Result<TopicStatus, KafkaError> {
    let new_topic = NewTopic::new(topic, partitions, TopicReplication::Fixed(replication));
    let opts = AdminOptions::new().operation_timeout(Some(timeout));

    let results = admin.create_topics(&[new_topic], &opts).await?;

    let mut status = TopicStatus::Created;
    for result in results {
        match result {
            Ok(name) => info!(topic = %name, partitions, "created topic"),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                debug!(topic = %name, "topic already exists");
                status = TopicStatus::AlreadyExists;
            }
            Err((_, code)) => return Err(KafkaError::AdminOp(code)),
        }
    }

    Ok(status)
}
