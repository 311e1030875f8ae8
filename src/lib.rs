//! RankPilot Stream
//!
//! Real-time streaming dispatcher for the RankPilot dashboards.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture with clear separation of concerns:
//!
//! - **Domain**: Core types and rules (Tier quotas, Client registrations, DataPoints)
//! - **Application**: Port interfaces (DeliverySink, PayloadTransform)
//! - **Infrastructure**: The dispatch engine, transforms, rate gate, synthetic producer
//! - **Presentation**: WebSocket, SSE and health/metrics handlers
//!
//! # Features
//!
//! - Tiered registration with per-user connection quotas
//! - Topic subscriptions capped per tier, with lazy topic activation
//! - Fan-out with per-client rate pacing, cache-reference compression and
//!   shallow delta encoding
//! - Collaboration broadcast between dashboard peers
//! - Heartbeat-based staleness eviction and periodic aggregate metrics
//!
//! # Example
//!
//! ```ignore
//! use rankpilot_stream::{StreamServer, StreamerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = StreamerConfig::default();
//!     let server = StreamServer::new(config);
//!     server.run().await.unwrap();
//! }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types
pub use domain::{
    ClientDescriptor, ClientId, CollaborationAction, CollaborationEvent, ConnectionKind,
    DashboardId, DataPoint, DeliveryPrefs, PointSource, QuotaScope, QuotaTable, StreamError,
    StreamMetrics, Tier, TierLimits, Topic, UserId,
};

pub use application::{DeliverySink, PayloadTransform, SinkError, TransformOutcome};

pub use infrastructure::{
    CompressionCache, DeliveryGate, DeltaEncoder, DispatcherConfig, DispatcherHandle, MpscSink,
    ProducerConfig, RegisterRequest, StreamDispatcher, StreamerConfig, SyntheticProducer,
    TopicActivations,
};

pub use presentation::{AppState, create_router};

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// The streaming service: dispatch engine, synthetic producer and the
/// HTTP surface wired together.
pub struct StreamServer {
    pub config: StreamerConfig,
    handle: DispatcherHandle,
    producer: SyntheticProducer,
    engine: JoinHandle<()>,
}

impl StreamServer {
    /// Spawn the engine and producer. Must be called on a tokio runtime.
    pub fn new(config: StreamerConfig) -> Self {
        let (handle, activations, engine) =
            StreamDispatcher::spawn(config.dispatcher_config());
        let producer =
            SyntheticProducer::spawn(handle.clone(), activations, config.producer_config());

        StreamServer {
            config,
            handle,
            producer,
            engine,
        }
    }

    /// Handle for publishing, collaboration broadcast and metrics.
    pub fn handle(&self) -> DispatcherHandle {
        self.handle.clone()
    }

    /// Build the service router (WebSocket, SSE, health, metrics).
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            handle: self.handle.clone(),
            delivery_buffer: self.config.channels.delivery_buffer,
            sse_heartbeat: Duration::from_millis(
                (self.config.timing.staleness_threshold_ms / 3).max(1),
            ),
        });
        create_router(state)
    }

    /// Serve until the process ends.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let router = self.router();

        tracing::info!("{} listening on {}", self.config.name, addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await
    }

    /// Stop the producer and the engine. Safe to call multiple times.
    pub fn shutdown(&self) {
        self.producer.shutdown();
        self.handle.shutdown();
    }

    /// Shut down and wait for the engine task to finish.
    pub async fn join(self) {
        self.shutdown();
        let _ = self.engine.await;
    }
}
