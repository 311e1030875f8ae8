mod synthetic;

pub use synthetic::{ProducerConfig, SyntheticProducer};
