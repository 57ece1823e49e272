use rdkafka::error::{KafkaError, RDKafkaErrorCode};

/// Whether a client error means the client cannot make progress any more.
///
/// Connection hiccups, timeouts, rebalances and broker-side retriable codes
/// are transient: librdkafka reconnects on its own and the caller should
/// just try again on the next iteration.
pub fn is_fatal(error: &KafkaError) -> bool {
    match error {
        KafkaError::MessageConsumptionFatal(_) => true,
        KafkaError::Canceled => true,
        KafkaError::ClientConfig(..) | KafkaError::ClientCreation(_) => true,
        KafkaError::Subscription(_) => true,
        KafkaError::Global(code)
        | KafkaError::MessageConsumption(code)
        | KafkaError::MessageProduction(code) => is_fatal_code(*code),
        _ => false,
    }
}

fn is_fatal_code(code: RDKafkaErrorCode) -> bool {
    matches!(
        code,
        RDKafkaErrorCode::Authentication
            | RDKafkaErrorCode::SaslAuthenticationFailed
            | RDKafkaErrorCode::TopicAuthorizationFailed
            | RDKafkaErrorCode::GroupAuthorizationFailed
            | RDKafkaErrorCode::ClusterAuthorizationFailed
            | RDKafkaErrorCode::Fatal
    )
}
