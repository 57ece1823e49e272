//! Publish a random dog event to Kafka every few seconds.
use std::process::ExitCode;
use std::time::Duration;

use dog_common::generator::DogEventGenerator;
use dog_common::kafka::KafkaEventSink;
use dog_common::lifecycle::shutdown_token;
use dog_common::logging::init_tracing;
use dog_common::metrics::{serve, setup_metrics_recorder, setup_metrics_router};
use dog_producer::config::Config;
use dog_producer::error::ProducerError;
use dog_producer::producer::DogProducer;
use envconfig::Envconfig;
use health::HealthRegistry;
use tracing::{error, info};

async fn run() -> Result<(), ProducerError> {
    let config = Config::init_from_env()?;
    info!(
        topic = %config.topic,
        brokers = %config.kafka.kafka_hosts,
        interval_seconds = config.interval_seconds,
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
    let sink = KafkaEventSink::connect(&config.kafka, config.topic_spec(), kafka_liveness)
        .map_err(ProducerError::Connectivity)?;

    let loop_liveness = liveness.register(
        "producer_loop",
        config.interval() * 2 + Duration::from_secs(30),
    );
    let shutdown = shutdown_token();

    let summary = DogProducer::new(
        sink,
        DogEventGenerator::new(),
        &config.topic,
        config.interval(),
    )
    .with_liveness(loop_liveness)
    .run(&shutdown)
    .await?;

    info!(
        sent = summary.sent,
        send_errors = summary.send_errors,
        encode_errors = summary.encode_errors,
        "producer summary"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    info!("START dog producer");

    let code = match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "dog producer failed");
            ExitCode::from(e.exit_code())
        }
    };

    info!("END dog producer");
    code
}
