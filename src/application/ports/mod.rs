mod delivery_sink;
mod transforms;

pub use delivery_sink::{DeliverySink, SinkError};
pub use transforms::{PayloadTransform, TransformOutcome};
