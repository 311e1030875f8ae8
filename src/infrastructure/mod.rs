pub mod config;
pub mod dispatcher;
pub mod producer;
pub mod rate_limiter;
pub mod sinks;
pub mod transforms;

pub use config::{ConfigError, ServerConfig, StreamerConfig};
pub use dispatcher::{
    DispatcherCommand, DispatcherConfig, DispatcherHandle, RegisterRequest, StreamDispatcher,
    TopicActivations,
};
pub use producer::{ProducerConfig, SyntheticProducer};
pub use rate_limiter::DeliveryGate;
pub use sinks::MpscSink;
pub use transforms::{CompressionCache, DeltaEncoder};
