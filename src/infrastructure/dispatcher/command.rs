use crate::application::ports::DeliverySink;
use crate::domain::{
    ClientDescriptor, ClientId, CollaborationEvent, ConnectionKind, DashboardId, DataPoint,
    StreamError, StreamMetrics, Tier, Topic, UserId,
};
use std::fmt;
use tokio::sync::oneshot;

/// Registration request handed to the engine together with the sink it
/// will own for the registration's lifetime.
pub struct RegisterRequest {
    pub client_id: ClientId,
    pub user_id: UserId,
    pub tier: Tier,
    pub connection: ConnectionKind,
    pub dashboard_id: Option<DashboardId>,
    pub sink: Box<dyn DeliverySink>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("client_id", &self.client_id)
            .field("user_id", &self.user_id)
            .field("tier", &self.tier)
            .field("connection", &self.connection)
            .field("dashboard_id", &self.dashboard_id)
            .finish_non_exhaustive()
    }
}

/// Commands processed sequentially by the dispatcher engine task.
#[derive(Debug)]
pub enum DispatcherCommand {
    /// Register a client under its tier's connection quota
    Register {
        request: RegisterRequest,
        reply: oneshot::Sender<Result<ClientDescriptor, StreamError>>,
    },

    /// Add topic subscriptions, partial success at the tier cap
    Subscribe {
        client_id: ClientId,
        topics: Vec<Topic>,
        reply: oneshot::Sender<Result<Vec<Topic>, StreamError>>,
    },

    /// Remove topic subscriptions; unknown topics are ignored
    Unsubscribe {
        client_id: ClientId,
        topics: Vec<Topic>,
        reply: oneshot::Sender<Result<Vec<Topic>, StreamError>>,
    },

    /// Fire-and-forget fan-out of one data point
    Publish { point: DataPoint },

    /// Broadcast to dashboard peers, excluding the originating user
    Collaboration { event: CollaborationEvent },

    /// Refresh a client's liveness
    Heartbeat { client_id: ClientId },

    /// Explicit teardown; true if the client was present
    Unregister {
        client_id: ClientId,
        reply: oneshot::Sender<bool>,
    },

    /// Current aggregate counters without resetting the window
    GetMetrics {
        reply: oneshot::Sender<StreamMetrics>,
    },

    /// Stop the engine, closing every sink best-effort
    Shutdown,
}
