pub mod ports;

pub use ports::{DeliverySink, PayloadTransform, SinkError, TransformOutcome};
