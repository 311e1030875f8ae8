use crate::application::ports::{DeliverySink, PayloadTransform, TransformOutcome};
use crate::domain::{
    ClientDescriptor, ClientId, ClientRegistration, CollaborationEvent, DataPoint, QuotaScope,
    QuotaTable, StreamError, StreamMetrics, Topic, UserId,
};
use crate::infrastructure::rate_limiter::DeliveryGate;
use crate::infrastructure::transforms::{CompressionCache, DeltaEncoder};
use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use super::command::{DispatcherCommand, RegisterRequest};
use super::handle::{DispatcherHandle, TopicActivations};

/// Configuration for the dispatcher engine.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Per-tier quota table; static for the process lifetime.
    pub quotas: QuotaTable,
    /// How often stale clients are swept out.
    pub sweep_interval: Duration,
    /// Liveness age beyond which a client is evicted.
    pub staleness_threshold: Duration,
    /// How often aggregate metrics are reported.
    pub metrics_interval: Duration,
    /// Capacity of the metrics broadcast channel.
    pub metrics_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            quotas: QuotaTable::default(),
            sweep_interval: Duration::from_secs(10),
            staleness_threshold: Duration::from_secs(30),
            metrics_interval: Duration::from_secs(1),
            metrics_capacity: 64,
        }
    }
}

/// A registration together with the sink the engine owns for it.
struct ClientSlot {
    registration: ClientRegistration,
    sink: Box<dyn DeliverySink>,
}

/// The streaming dispatch engine.
///
/// One spawned task owns every registry and cache; commands and timer
/// ticks interleave through `select!` and never run concurrently, so no
/// locking is needed anywhere in here. Fan-out for one publish completes
/// within a single command step, which is what gives subscribers
/// registration-order delivery per topic.
pub struct StreamDispatcher {
    config: DispatcherConfig,
    /// Registration order is fan-out order.
    clients: IndexMap<ClientId, ClientSlot>,
    connections_per_user: HashMap<UserId, u32>,
    /// Lazily-activated topics; never torn down while the process runs,
    /// even when the last subscriber leaves.
    topics: IndexSet<Topic>,
    gate: DeliveryGate,
    compression: CompressionCache,
    delta: DeltaEncoder,
    topic_activations: mpsc::UnboundedSender<Topic>,
    metrics_tx: broadcast::Sender<StreamMetrics>,
    delivered_in_window: u64,
    evicted_total: u64,
    last_compression_ratio: Option<f64>,
}

impl StreamDispatcher {
    /// Spawn the engine task and return its handle, the stream of topic
    /// activations (for a producer), and the task handle.
    pub fn spawn(config: DispatcherConfig) -> (DispatcherHandle, TopicActivations, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (topic_tx, topic_rx) = mpsc::unbounded_channel();
        let (metrics_tx, _) = broadcast::channel(config.metrics_capacity.max(1));

        let engine = StreamDispatcher {
            config,
            clients: IndexMap::new(),
            connections_per_user: HashMap::new(),
            topics: IndexSet::new(),
            gate: DeliveryGate::new(),
            compression: CompressionCache::new(),
            delta: DeltaEncoder::new(),
            topic_activations: topic_tx,
            metrics_tx: metrics_tx.clone(),
            delivered_in_window: 0,
            evicted_total: 0,
            last_compression_ratio: None,
        };

        let join = tokio::spawn(engine.run(receiver));
        (
            DispatcherHandle::new(sender, metrics_tx),
            TopicActivations::new(topic_rx),
            join,
        )
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<DispatcherCommand>) {
        tracing::info!(
            sweep_secs = self.config.sweep_interval.as_secs(),
            staleness_secs = self.config.staleness_threshold.as_secs(),
            "stream dispatcher started"
        );

        let mut sweep = interval_at(
            Instant::now() + self.config.sweep_interval,
            self.config.sweep_interval,
        );
        let mut metrics = interval_at(
            Instant::now() + self.config.metrics_interval,
            self.config.metrics_interval,
        );

        loop {
            tokio::select! {
                cmd = receiver.recv() => match cmd {
                    Some(DispatcherCommand::Shutdown) | None => break,
                    Some(cmd) => self.process_command(cmd),
                },
                _ = sweep.tick() => self.sweep_stale(),
                _ = metrics.tick() => self.report_metrics(),
            }
        }

        self.shutdown();
    }

    fn process_command(&mut self, cmd: DispatcherCommand) {
        match cmd {
            DispatcherCommand::Register { request, reply } => {
                let _ = reply.send(self.handle_register(request));
            }
            DispatcherCommand::Subscribe {
                client_id,
                topics,
                reply,
            } => {
                let _ = reply.send(self.handle_subscribe(&client_id, topics));
            }
            DispatcherCommand::Unsubscribe {
                client_id,
                topics,
                reply,
            } => {
                let _ = reply.send(self.handle_unsubscribe(&client_id, topics));
            }
            DispatcherCommand::Publish { point } => self.handle_publish(point),
            DispatcherCommand::Collaboration { event } => self.handle_collaboration(event),
            DispatcherCommand::Heartbeat { client_id } => {
                if let Some(slot) = self.clients.get_mut(&client_id) {
                    slot.registration.touch();
                }
            }
            DispatcherCommand::Unregister { client_id, reply } => {
                let removed = self.remove_client(&client_id);
                if removed {
                    tracing::info!(client_id = %client_id, "client unregistered");
                }
                let _ = reply.send(removed);
            }
            DispatcherCommand::GetMetrics { reply } => {
                let _ = reply.send(self.current_metrics());
            }
            DispatcherCommand::Shutdown => unreachable!("handled in run loop"),
        }
    }

    fn handle_register(
        &mut self,
        request: RegisterRequest,
    ) -> Result<ClientDescriptor, StreamError> {
        if self.clients.contains_key(&request.client_id) {
            return Err(StreamError::DuplicateClient(request.client_id));
        }

        let limits = self.config.quotas.limits(request.tier);
        let current = self
            .connections_per_user
            .get(&request.user_id)
            .copied()
            .unwrap_or(0);
        if current >= limits.max_connections_per_user {
            tracing::debug!(
                user_id = %request.user_id,
                tier = %request.tier,
                limit = limits.max_connections_per_user,
                "connection quota exceeded"
            );
            return Err(StreamError::QuotaExceeded {
                scope: QuotaScope::Connections,
                tier: request.tier,
                limit: limits.max_connections_per_user,
            });
        }

        let registration = ClientRegistration::new(
            request.client_id.clone(),
            request.user_id.clone(),
            request.tier,
            limits,
            request.connection,
            request.dashboard_id,
        );
        let descriptor = registration.descriptor();

        *self
            .connections_per_user
            .entry(request.user_id)
            .or_insert(0) += 1;
        self.clients.insert(
            request.client_id.clone(),
            ClientSlot {
                registration,
                sink: request.sink,
            },
        );

        tracing::info!(
            client_id = %request.client_id,
            tier = %descriptor.tier,
            "client registered"
        );
        Ok(descriptor)
    }

    fn handle_subscribe(
        &mut self,
        client_id: &ClientId,
        topics: Vec<Topic>,
    ) -> Result<Vec<Topic>, StreamError> {
        let slot = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| StreamError::ClientNotFound(client_id.clone()))?;
        let cap = self
            .config
            .quotas
            .limits(slot.registration.tier)
            .max_subscriptions as usize;

        let mut accepted = Vec::new();
        for topic in topics {
            if slot.registration.subscription_count() >= cap {
                // Partial success: topics added so far stay subscribed
                tracing::debug!(
                    client_id = %client_id,
                    cap = cap,
                    "subscription cap reached, remaining topics skipped"
                );
                break;
            }
            if !slot.registration.add_subscription(topic.clone()) {
                continue;
            }
            accepted.push(topic.clone());

            if self.topics.insert(topic.clone()) {
                tracing::info!(topic = %topic, "topic activated");
                let _ = self.topic_activations.send(topic);
            }
        }

        Ok(accepted)
    }

    fn handle_unsubscribe(
        &mut self,
        client_id: &ClientId,
        topics: Vec<Topic>,
    ) -> Result<Vec<Topic>, StreamError> {
        let slot = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| StreamError::ClientNotFound(client_id.clone()))?;

        let removed = topics
            .into_iter()
            .filter(|t| slot.registration.remove_subscription(t))
            .collect();
        Ok(removed)
    }

    fn handle_publish(&mut self, point: DataPoint) {
        let mut broken = Vec::new();

        for (id, slot) in self.clients.iter_mut() {
            if !slot.registration.is_subscribed(&point.topic) {
                continue;
            }
            if !slot
                .registration
                .matches_dashboard(point.dashboard_id.as_ref())
            {
                continue;
            }
            if !self.gate.try_pass(
                id,
                &point.topic,
                slot.registration.prefs.min_delivery_interval(),
            ) {
                tracing::trace!(client_id = %id, topic = %point.topic, "delivery paced out");
                continue;
            }

            let mut delivery = point.clone();
            if slot.registration.prefs.compression
                && let TransformOutcome::CacheHit {
                    reference_len,
                    original_len,
                } = self.compression.apply(id, &mut delivery)
                && original_len > 0
            {
                self.last_compression_ratio = Some(reference_len as f64 / original_len as f64);
            }
            if slot.registration.prefs.delta {
                self.delta.apply(id, &mut delivery);
            }

            match slot.sink.deliver(delivery) {
                Ok(()) => {
                    slot.registration.touch();
                    self.delivered_in_window += 1;
                }
                Err(e) => {
                    tracing::warn!(client_id = %id, error = %e, "delivery failed, evicting");
                    broken.push(id.clone());
                }
            }
        }

        for id in &broken {
            self.evict(id);
        }
    }

    fn handle_collaboration(&mut self, event: CollaborationEvent) {
        let origin = event.user_id.clone();
        let dashboard = event.dashboard_id.clone();
        let point = event.into_data_point();

        let mut broken = Vec::new();
        for (id, slot) in self.clients.iter_mut() {
            if slot.registration.dashboard_id.as_ref() != Some(&dashboard) {
                continue;
            }
            if slot.registration.user_id == origin {
                continue;
            }

            // Collaboration goes out in full and unpaced: stale cursor or
            // edit events are worse than no event at all.
            match slot.sink.deliver(point.clone()) {
                Ok(()) => {
                    slot.registration.touch();
                    self.delivered_in_window += 1;
                }
                Err(e) => {
                    tracing::warn!(client_id = %id, error = %e, "delivery failed, evicting");
                    broken.push(id.clone());
                }
            }
        }

        for id in &broken {
            self.evict(id);
        }
    }

    /// Shared teardown for unregister and eviction. Returns false for an
    /// unknown id, which makes both paths idempotent.
    fn remove_client(&mut self, client_id: &ClientId) -> bool {
        let Some(slot) = self.clients.shift_remove(client_id) else {
            return false;
        };

        slot.sink.close();

        let user_id = slot.registration.user_id;
        if let Some(count) = self.connections_per_user.get_mut(&user_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.connections_per_user.remove(&user_id);
            }
        }

        self.gate.forget_client(client_id);
        self.compression.forget_client(client_id);
        self.delta.forget_client(client_id);
        true
    }

    fn evict(&mut self, client_id: &ClientId) {
        if self.remove_client(client_id) {
            self.evicted_total += 1;
        }
    }

    fn sweep_stale(&mut self) {
        let threshold = self.config.staleness_threshold;
        let stale: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, slot)| slot.registration.is_stale(threshold))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            tracing::info!(client_id = %id, "evicting stale client");
            self.evict(id);
        }
    }

    fn current_metrics(&self) -> StreamMetrics {
        StreamMetrics {
            registered_clients: self.clients.len(),
            active_topics: self.topics.len(),
            delivered_last_window: self.delivered_in_window,
            compression_ratio: self.last_compression_ratio,
            evicted_total: self.evicted_total,
            timestamp: Utc::now(),
        }
    }

    fn report_metrics(&mut self) {
        let snapshot = self.current_metrics();
        self.delivered_in_window = 0;
        // No receivers is fine
        let _ = self.metrics_tx.send(snapshot);
    }

    fn shutdown(&mut self) {
        let count = self.clients.len();
        for (_, slot) in self.clients.drain(..) {
            slot.sink.close();
        }
        self.connections_per_user.clear();
        self.topics.clear();
        tracing::info!(clients_closed = count, "stream dispatcher shut down");
    }
}
