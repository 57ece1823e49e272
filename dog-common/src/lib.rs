pub mod aggregator;
pub mod broker;
pub mod codec;
pub mod event;
pub mod fixtures;
pub mod generator;
pub mod kafka;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod test_utils;
