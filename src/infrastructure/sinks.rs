use crate::application::ports::{DeliverySink, SinkError};
use crate::domain::DataPoint;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Delivery sink backed by a bounded tokio mpsc channel.
///
/// `try_send` keeps the engine non-blocking: a full buffer means the
/// consumer is not draining and is treated the same as a closed channel,
/// which gets the client evicted.
pub struct MpscSink {
    tx: mpsc::Sender<DataPoint>,
}

impl MpscSink {
    pub fn new(tx: mpsc::Sender<DataPoint>) -> Self {
        MpscSink { tx }
    }

    /// Convenience constructor returning the consuming half alongside.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<DataPoint>) {
        let (tx, rx) = mpsc::channel(buffer);
        (MpscSink { tx }, rx)
    }
}

impl DeliverySink for MpscSink {
    fn deliver(&self, point: DataPoint) -> Result<(), SinkError> {
        self.tx.try_send(point).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    // Closing is the receiver's side-effect of the sender being dropped;
    // the registration drop takes care of it.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Topic;
    use serde_json::json;

    fn point() -> DataPoint {
        DataPoint::generated(Topic::new("seo-metrics").unwrap(), json!({"v": 1}))
    }

    #[tokio::test]
    async fn test_deliver_and_receive() {
        let (sink, mut rx) = MpscSink::channel(4);
        sink.deliver(point()).unwrap();
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_full_buffer_errors() {
        let (sink, _rx) = MpscSink::channel(1);
        sink.deliver(point()).unwrap();
        assert_eq!(sink.deliver(point()), Err(SinkError::Full));
    }

    #[tokio::test]
    async fn test_closed_channel_errors() {
        let (sink, rx) = MpscSink::channel(1);
        drop(rx);
        assert_eq!(sink.deliver(point()), Err(SinkError::Closed));
    }
}
