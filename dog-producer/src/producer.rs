use std::time::Duration;

use dog_common::broker::{EventSink, Release};
use dog_common::codec::encode;
use dog_common::event::DogEvent;
use dog_common::lifecycle::ReleaseGuard;
use dog_common::metrics::{ENCODE_ERRORS, EVENTS_SENT, SEND_ERRORS};
use health::HealthHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ProducerError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProducerSummary {
    pub sent: u64,
    pub send_errors: u64,
    pub encode_errors: u64,
}

/// Publishes one event per `interval` until cancelled.
///
/// The sink is released exactly once whichever way `run` ends. Send failures
/// are counted and skipped; only a fatal broker error stops the loop early.
pub struct DogProducer<S, I> {
    sink: S,
    events: I,
    topic: String,
    interval: Duration,
    liveness: Option<HealthHandle>,
}

impl<S, I> DogProducer<S, I>
where
    S: EventSink + Release,
    I: Iterator<Item = DogEvent>,
{
    pub fn new(sink: S, events: I, topic: &str, interval: Duration) -> Self {
        Self {
            sink,
            events,
            topic: topic.to_owned(),
            interval,
            liveness: None,
        }
    }

    pub fn with_liveness(mut self, liveness: HealthHandle) -> Self {
        self.liveness = Some(liveness);
        self
    }

    pub async fn run(self, shutdown: &CancellationToken) -> Result<ProducerSummary, ProducerError> {
        let DogProducer {
            sink,
            mut events,
            topic,
            interval,
            liveness,
        } = self;
        let sink = ReleaseGuard::new(sink);

        if let Err(source) = sink.ensure_topic().await {
            error!(topic, error = %source, "failed to set up topic");
            sink.release();
            return Err(ProducerError::TopicSetup { topic, source });
        }
        info!(topic, "topic ready");

        let mut summary = ProducerSummary::default();
        let outcome = loop {
            if shutdown.is_cancelled() {
                break Ok(());
            }
            if let Some(liveness) = &liveness {
                liveness.report_healthy();
            }

            let Some(event) = events.next() else {
                info!("event source exhausted");
                break Ok(());
            };

            match encode(&event) {
                Ok(payload) => {
                    let sent = tokio::select! {
                        _ = shutdown.cancelled() => break Ok(()),
                        sent = sink.send(&payload) => sent,
                    };
                    match sent {
                        Ok(()) => {
                            summary.sent += 1;
                            metrics::counter!(EVENTS_SENT).increment(1);
                            info!(topic, event = %event, "published dog event");
                        }
                        Err(e) if e.is_fatal() => {
                            error!(topic, error = %e, "fatal error publishing dog event");
                            if let Some(liveness) = &liveness {
                                liveness.report_unhealthy();
                            }
                            break Err(ProducerError::Fatal(e));
                        }
                        Err(e) => {
                            summary.send_errors += 1;
                            metrics::counter!(SEND_ERRORS).increment(1);
                            error!(topic, error = %e, "failed to publish dog event");
                        }
                    }
                }
                Err(e) => {
                    summary.encode_errors += 1;
                    metrics::counter!(ENCODE_ERRORS).increment(1);
                    error!(error = %e, "failed to encode dog event");
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                _ = tokio::time::sleep(interval) => {}
            }
        };

        if shutdown.is_cancelled() {
            info!(topic, "shutdown requested, stopping producer");
        }
        sink.release();
        info!(
            topic,
            sent = summary.sent,
            send_errors = summary.send_errors,
            "producer stopped"
        );

        outcome.map(|()| summary)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dog_common::broker::BrokerError;
    use dog_common::codec::decode;
    use dog_common::generator::DogEventGenerator;
    use dog_common::test_utils::MemoryBroker;

    use super::*;

    const TOPIC: &str = "dogs_topic";

    fn events(toys: &[&str]) -> Vec<DogEvent> {
        toys.iter()
            .map(|toy| DogEvent::new("Rex", "Poodle", 3, toy))
            .collect()
    }

    #[tokio::test]
    async fn publishes_every_event_in_order() {
        let broker = MemoryBroker::new();
        let shutdown = CancellationToken::new();
        let sent = events(&["Rope", "Rope", "Stick"]);

        let summary = DogProducer::new(
            broker.sink(TOPIC),
            sent.clone().into_iter(),
            TOPIC,
            Duration::ZERO,
        )
        .run(&shutdown)
        .await
        .unwrap();

        assert_eq!(summary.sent, 3);
        assert!(broker.topic_ensured(TOPIC));
        let published: Vec<DogEvent> = broker
            .messages(TOPIC)
            .iter()
            .map(|m| decode(m.payload.as_deref()).unwrap())
            .collect();
        assert_eq!(published, sent);
        assert_eq!(broker.releases(), 1);
    }

    #[tokio::test]
    async fn send_failures_do_not_stop_the_loop() {
        let broker = MemoryBroker::new();
        broker.inject_send_error(BrokerError::Transient("queue full".to_string()));
        let shutdown = CancellationToken::new();

        let summary = DogProducer::new(
            broker.sink(TOPIC),
            events(&["Rope", "Stick", "Frisbee"]).into_iter(),
            TOPIC,
            Duration::ZERO,
        )
        .run(&shutdown)
        .await
        .unwrap();

        assert_eq!(summary.send_errors, 1);
        assert_eq!(summary.sent, 2);
        assert_eq!(broker.send_attempts(), 3);
        assert_eq!(broker.messages(TOPIC).len(), 2);
    }

    #[tokio::test]
    async fn fatal_errors_stop_the_loop_and_release() {
        let broker = MemoryBroker::new();
        broker.inject_send_error(BrokerError::Fatal("not authorized".to_string()));
        let shutdown = CancellationToken::new();

        let result = DogProducer::new(
            broker.sink(TOPIC),
            DogEventGenerator::with_seed(3),
            TOPIC,
            Duration::ZERO,
        )
        .run(&shutdown)
        .await;

        assert!(matches!(result, Err(ProducerError::Fatal(_))));
        assert_eq!(broker.send_attempts(), 1);
        assert_eq!(broker.releases(), 1);
    }

    #[tokio::test]
    async fn topic_setup_failure_is_reported_and_releases() {
        let broker = MemoryBroker::new();
        broker.inject_ensure_error(BrokerError::Transient("timed out".to_string()));
        let shutdown = CancellationToken::new();

        let result = DogProducer::new(
            broker.sink(TOPIC),
            DogEventGenerator::with_seed(3),
            TOPIC,
            Duration::ZERO,
        )
        .run(&shutdown)
        .await;

        match result {
            Err(err @ ProducerError::TopicSetup { .. }) => assert_eq!(err.exit_code(), 4),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(broker.send_attempts(), 0);
        assert_eq!(broker.releases(), 1);
    }

    #[tokio::test]
    async fn cancellation_mid_wait_releases_once_and_stops_publishing() {
        let broker = MemoryBroker::new();
        let shutdown = CancellationToken::new();

        let producer = DogProducer::new(
            broker.sink(TOPIC),
            DogEventGenerator::with_seed(11),
            TOPIC,
            Duration::from_secs(3600),
        );
        let token = shutdown.clone();
        let handle = tokio::spawn(async move { producer.run(&token).await });

        // The first event goes out immediately, then the loop sleeps
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while broker.send_attempts() == 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(broker.send_attempts(), 1);

        shutdown.cancel();
        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("producer did not stop after cancellation")
            .unwrap()
            .unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(broker.releases(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(broker.send_attempts(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_publishes_nothing() {
        let broker = MemoryBroker::new();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let summary = DogProducer::new(
            broker.sink(TOPIC),
            DogEventGenerator::with_seed(5),
            TOPIC,
            Duration::ZERO,
        )
        .run(&shutdown)
        .await
        .unwrap();

        assert_eq!(summary, ProducerSummary::default());
        assert_eq!(broker.send_attempts(), 0);
        assert_eq!(broker.releases(), 1);
    }

    #[tokio::test]
    async fn reports_liveness_each_iteration() {
        let broker = MemoryBroker::new();
        let registry = health::HealthRegistry::new("liveness");
        let handle = registry.register("producer_loop", Duration::from_secs(30));
        let shutdown = CancellationToken::new();

        DogProducer::new(
            broker.sink(TOPIC),
            events(&["Rope"]).into_iter(),
            TOPIC,
            Duration::ZERO,
        )
        .with_liveness(handle)
        .run(&shutdown)
        .await
        .unwrap();

        assert!(registry.get_status().healthy);
    }

    #[tokio::test]
    async fn fatal_errors_mark_the_loop_unhealthy() {
        let broker = MemoryBroker::new();
        broker.inject_send_error(BrokerError::Fatal("not authorized".to_string()));
        let registry = health::HealthRegistry::new("liveness");
        let handle = registry.register("producer_loop", Duration::from_secs(30));
        let shutdown = CancellationToken::new();

        let result = DogProducer::new(
            broker.sink(TOPIC),
            DogEventGenerator::with_seed(3),
            TOPIC,
            Duration::ZERO,
        )
        .with_liveness(handle)
        .run(&shutdown)
        .await;

        assert!(matches!(result, Err(ProducerError::Fatal(_))));
        let status = registry.get_status();
        assert!(!status.healthy);
        assert_eq!(
            status.components.get("producer_loop"),
            Some(&health::ComponentStatus::Unhealthy)
        );
    }
}
