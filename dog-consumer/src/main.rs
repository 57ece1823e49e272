//! Tally the favorite toys of the dogs published to Kafka.
use std::process::ExitCode;
use std::time::Duration;

use dog_common::aggregator::ToyCounts;
use dog_common::kafka::KafkaEventSource;
use dog_common::lifecycle::shutdown_token;
use dog_common::logging::init_tracing;
use dog_common::metrics::{serve, setup_metrics_recorder, setup_metrics_router};
use dog_consumer::config::Config;
use dog_consumer::consumer::DogConsumer;
use dog_consumer::error::ConsumerError;
use envconfig::Envconfig;
use health::HealthRegistry;
use tracing::{error, info};

async fn run() -> Result<(), ConsumerError> {
    let config = Config::init_from_env()?;
    info!(
        topic = %config.topic,
        group = %config.consumer.kafka_consumer_group,
        brokers = %config.kafka.kafka_hosts,
        policy = ?config.missing_toy_policy,
        "loaded configuration"
    );

    let liveness = HealthRegistry::new("liveness");
    let recorder = setup_metrics_recorder()?;
    let router = setup_metrics_router(recorder, liveness.clone());
    let bind = config.bind();
    tokio::task::spawn(async move {
        if let Err(e) = serve(router, &bind).await {
            error!(error = %e, bind, "failed to serve metrics");
        }
    });

    let kafka_liveness = liveness.register("rdkafka", Duration::from_secs(30));
    let source = KafkaEventSource::connect(
        &config.kafka,
        &config.consumer,
        &config.topic,
        kafka_liveness,
    )
    .map_err(ConsumerError::Connectivity)?;

    let loop_liveness = liveness.register(
        "consumer_loop",
        config.poll_timeout() * 2 + Duration::from_secs(30),
    );
    let shutdown = shutdown_token();

    let mut counts = ToyCounts::new();
    let summary = DogConsumer::new(source, &config.topic)
        .with_poll(config.poll_timeout(), config.max_poll_records)
        .with_report_interval(config.report_interval())
        .with_missing_toy_policy(config.missing_toy_policy)
        .with_liveness(loop_liveness)
        .run(&mut counts, &shutdown)
        .await?;

    info!(
        received = summary.received,
        counted = summary.counted,
        missing_toy = summary.missing_toy,
        decode_failures = summary.decode_failures,
        "consumer summary"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    info!("START dog consumer");

    let code = match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "dog consumer failed");
            ExitCode::from(e.exit_code())
        }
    };

    info!("END dog consumer");
    code
}
