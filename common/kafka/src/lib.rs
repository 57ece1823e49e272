pub mod admin;
pub mod config;
pub mod errors;
pub mod kafka_consumer;
pub mod kafka_producer;
pub mod test;

pub use kafka_producer::KafkaContext;
