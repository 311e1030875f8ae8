use crate::domain::DataPoint;
use thiserror::Error;

/// Push-capable channel the dispatcher writes deliveries to.
///
/// The dispatcher owns the sink exclusively for the registration's
/// lifetime. Writes must be non-blocking best-effort: a failed write is
/// information (the client is presumed broken and gets evicted), never
/// something to await or retry.
pub trait DeliverySink: Send {
    /// Push one data point without blocking.
    fn deliver(&self, point: DataPoint) -> Result<(), SinkError>;

    /// Close the underlying channel, best-effort. Default is a no-op for
    /// sinks that close by being dropped.
    fn close(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("sink buffer is full")]
    Full,
    #[error("sink is closed")]
    Closed,
}
