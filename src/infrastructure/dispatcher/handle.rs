use crate::domain::{
    ClientDescriptor, ClientId, CollaborationEvent, DataPoint, StreamError, StreamMetrics, Topic,
};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::command::{DispatcherCommand, RegisterRequest};

/// Cloneable handle for talking to a running dispatcher engine.
///
/// Registration and subscription round-trip through the engine and return
/// its answer; publish, collaboration and heartbeat are fire-and-forget.
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::UnboundedSender<DispatcherCommand>,
    metrics: broadcast::Sender<StreamMetrics>,
}

impl DispatcherHandle {
    pub(super) fn new(
        sender: mpsc::UnboundedSender<DispatcherCommand>,
        metrics: broadcast::Sender<StreamMetrics>,
    ) -> Self {
        DispatcherHandle { sender, metrics }
    }

    pub async fn register_client(
        &self,
        request: RegisterRequest,
    ) -> Result<ClientDescriptor, StreamError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(DispatcherCommand::Register { request, reply })
            .map_err(|_| StreamError::EngineClosed)?;
        rx.await.map_err(|_| StreamError::EngineClosed)?
    }

    /// Returns the topics actually subscribed this call; may be a strict
    /// subset of the request when the tier cap cuts it short.
    pub async fn subscribe(
        &self,
        client_id: ClientId,
        topics: Vec<Topic>,
    ) -> Result<Vec<Topic>, StreamError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(DispatcherCommand::Subscribe {
                client_id,
                topics,
                reply,
            })
            .map_err(|_| StreamError::EngineClosed)?;
        rx.await.map_err(|_| StreamError::EngineClosed)?
    }

    pub async fn unsubscribe(
        &self,
        client_id: ClientId,
        topics: Vec<Topic>,
    ) -> Result<Vec<Topic>, StreamError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(DispatcherCommand::Unsubscribe {
                client_id,
                topics,
                reply,
            })
            .map_err(|_| StreamError::EngineClosed)?;
        rx.await.map_err(|_| StreamError::EngineClosed)?
    }

    /// Fire-and-forget fan-out; a publish cannot fail as a whole and a
    /// publish after shutdown is silently dropped.
    pub fn publish(&self, point: DataPoint) {
        let _ = self.sender.send(DispatcherCommand::Publish { point });
    }

    pub fn broadcast_collaboration(&self, event: CollaborationEvent) {
        let _ = self.sender.send(DispatcherCommand::Collaboration { event });
    }

    pub fn heartbeat(&self, client_id: ClientId) {
        let _ = self.sender.send(DispatcherCommand::Heartbeat { client_id });
    }

    /// Idempotent teardown: true on removal, false for an unknown id or a
    /// stopped engine.
    pub async fn unregister_client(&self, client_id: ClientId) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .sender
            .send(DispatcherCommand::Unregister { client_id, reply })
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Current aggregate counters, without resetting the reporting window.
    pub async fn metrics(&self) -> Result<StreamMetrics, StreamError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(DispatcherCommand::GetMetrics { reply })
            .map_err(|_| StreamError::EngineClosed)?;
        rx.await.map_err(|_| StreamError::EngineClosed)
    }

    /// Periodic metrics snapshots, one per reporting interval.
    pub fn subscribe_metrics(&self) -> broadcast::Receiver<StreamMetrics> {
        self.metrics.subscribe()
    }

    /// Stop the engine. Safe to call any number of times.
    pub fn shutdown(&self) {
        let _ = self.sender.send(DispatcherCommand::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Stream of lazily-activated topics, consumed by a data producer.
pub struct TopicActivations {
    receiver: mpsc::UnboundedReceiver<Topic>,
}

impl TopicActivations {
    pub(super) fn new(receiver: mpsc::UnboundedReceiver<Topic>) -> Self {
        TopicActivations { receiver }
    }

    /// None once the engine has stopped.
    pub async fn recv(&mut self) -> Option<Topic> {
        self.receiver.recv().await
    }
}
