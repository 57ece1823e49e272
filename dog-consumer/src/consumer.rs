use std::time::Duration;

use dog_common::aggregator::ToyCounts;
use dog_common::broker::{EventSource, ReceivedMessage, Release};
use dog_common::codec::decode;
use dog_common::event::UNKNOWN;
use dog_common::lifecycle::ReleaseGuard;
use dog_common::metrics::{
    COMMIT_ERRORS, DECODE_FAILURES, MESSAGES_RECEIVED, MISSING_TOY, POLL_ERRORS, TOYS_COUNTED,
};
use health::HealthHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::MissingToyPolicy;
use crate::error::ConsumerError;

/// What happened to a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Counted { toy: String, count: u64 },
    MissingToy { counted_as_unknown: bool },
    Malformed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerSummary {
    pub batches: u64,
    pub received: u64,
    pub counted: u64,
    pub missing_toy: u64,
    pub decode_failures: u64,
    pub poll_errors: u64,
    pub commit_errors: u64,
    /// Periodic count snapshots logged
    pub reports: u64,
}

impl ConsumerSummary {
    fn record(&mut self, outcome: &Outcome) {
        self.received += 1;
        match outcome {
            Outcome::Counted { .. } => self.counted += 1,
            Outcome::MissingToy { counted_as_unknown } => {
                self.missing_toy += 1;
                if *counted_as_unknown {
                    self.counted += 1;
                }
            }
            Outcome::Malformed => self.decode_failures += 1,
        }
    }
}

/// Decodes one message and folds it into `counts`.
///
/// Never fails: a body that does not decode is logged and skipped, and a
/// missing toy is handled according to `policy`.
pub fn process_message(
    message: &ReceivedMessage,
    counts: &mut ToyCounts,
    policy: MissingToyPolicy,
) -> Outcome {
    metrics::counter!(MESSAGES_RECEIVED).increment(1);

    let event = match decode(message.payload.as_deref()) {
        Ok(event) => event,
        Err(e) => {
            metrics::counter!(DECODE_FAILURES).increment(1);
            error!(
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "failed to decode dog event, skipping"
            );
            return Outcome::Malformed;
        }
    };

    info!(partition = message.partition, offset = message.offset, "{}", event);

    match event.favorite_toy {
        Some(toy) => {
            let count = counts.record(&toy);
            metrics::counter!(TOYS_COUNTED, "toy" => toy.clone()).increment(1);
            Outcome::Counted { toy, count }
        }
        None => {
            metrics::counter!(MISSING_TOY).increment(1);
            warn!(
                partition = message.partition,
                offset = message.offset,
                dog = %event.name,
                "dog event has no favorite toy"
            );
            let counted_as_unknown = policy == MissingToyPolicy::CountUnknown;
            if counted_as_unknown {
                counts.record(UNKNOWN);
                metrics::counter!(TOYS_COUNTED, "toy" => UNKNOWN).increment(1);
            }
            Outcome::MissingToy { counted_as_unknown }
        }
    }
}

/// Polls batches and tallies favorite toys until cancelled.
///
/// Messages are processed strictly in poll order, and a batch is committed
/// only after every message in it reached the counts. The source is released
/// exactly once however `run` ends.
pub struct DogConsumer<S> {
    source: S,
    topic: String,
    poll_timeout: Duration,
    max_poll_records: usize,
    report_interval: Duration,
    policy: MissingToyPolicy,
    liveness: Option<HealthHandle>,
}

impl<S> DogConsumer<S>
where
    S: EventSource + Release,
{
    pub fn new(source: S, topic: &str) -> Self {
        Self {
            source,
            topic: topic.to_owned(),
            poll_timeout: Duration::from_secs(1),
            max_poll_records: 100,
            report_interval: Duration::from_secs(30),
            policy: MissingToyPolicy::default(),
            liveness: None,
        }
    }

    pub fn with_poll(mut self, timeout: Duration, max_records: usize) -> Self {
        self.poll_timeout = timeout;
        self.max_poll_records = max_records.max(1);
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn with_missing_toy_policy(mut self, policy: MissingToyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_liveness(mut self, liveness: HealthHandle) -> Self {
        self.liveness = Some(liveness);
        self
    }

    pub async fn run(
        self,
        counts: &mut ToyCounts,
        shutdown: &CancellationToken,
    ) -> Result<ConsumerSummary, ConsumerError> {
        let DogConsumer {
            source,
            topic,
            poll_timeout,
            max_poll_records,
            report_interval,
            policy,
            liveness,
        } = self;
        let mut source = ReleaseGuard::new(source);
        let mut summary = ConsumerSummary::default();
        let mut last_report = Instant::now();

        let outcome = loop {
            if shutdown.is_cancelled() {
                break Ok(());
            }
            if let Some(liveness) = &liveness {
                liveness.report_healthy();
            }

            let polled = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                polled = source.poll(poll_timeout, max_poll_records) => polled,
            };

            let batch = match polled {
                Ok(batch) => batch,
                Err(e) if e.is_fatal() => {
                    error!(topic, error = %e, "fatal error polling for dog events");
                    if let Some(liveness) = &liveness {
                        liveness.report_unhealthy();
                    }
                    break Err(ConsumerError::Fatal(e));
                }
                Err(e) => {
                    summary.poll_errors += 1;
                    metrics::counter!(POLL_ERRORS).increment(1);
                    warn!(topic, error = %e, "failed to poll for dog events, retrying");
                    tokio::select! {
                        _ = shutdown.cancelled() => break Ok(()),
                        _ = tokio::time::sleep(poll_timeout) => continue,
                    }
                }
            };

            if !batch.is_empty() {
                summary.batches += 1;
                for message in &batch {
                    let outcome = process_message(message, counts, policy);
                    summary.record(&outcome);
                }

                match source.commit(&batch).await {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => {
                        error!(topic, error = %e, "fatal error committing offsets");
                        if let Some(liveness) = &liveness {
                            liveness.report_unhealthy();
                        }
                        break Err(ConsumerError::Fatal(e));
                    }
                    Err(e) => {
                        summary.commit_errors += 1;
                        metrics::counter!(COMMIT_ERRORS).increment(1);
                        warn!(topic, error = %e, "failed to commit offsets, batch may be redelivered");
                    }
                }
            }

            if last_report.elapsed() >= report_interval {
                info!(topic, counts = ?counts.snapshot(), total = counts.total(), "toy counts so far");
                summary.reports += 1;
                last_report = Instant::now();
            }
        };

        if shutdown.is_cancelled() {
            info!(topic, "shutdown requested, stopping consumer");
        }
        source.release();
        info!(
            topic,
            received = summary.received,
            decode_failures = summary.decode_failures,
            missing_toy = summary.missing_toy,
            "connection closed"
        );
        info!(counts = ?counts.snapshot(), "Final toy counts");

        outcome.map(|()| summary)
    }
}
