use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::Stream;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::domain::{ClientId, ConnectionKind, DashboardId, Tier, Topic, UserId};
use crate::infrastructure::{DispatcherHandle, MpscSink, RegisterRequest};
use crate::presentation::rest::{ApiError, AppState};

/// Query parameters for an SSE connection
#[derive(Debug, Deserialize)]
pub struct SseParams {
    pub user_id: String,
    pub tier: String,
    /// Comma-separated topic names subscribed at connect time
    pub topics: String,
    #[serde(default)]
    pub dashboard_id: Option<String>,
}

/// Handle an SSE stream connection
///
/// SSE has no inbound channel, so a server-side task refreshes the
/// client's liveness while the stream is open; dropping the stream stops
/// the task and unregisters the client.
pub async fn sse_handler(
    Query(params): Query<SseParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let tier: Tier = params.tier.parse()?;
    let topics: Vec<Topic> = params
        .topics
        .split(',')
        .filter(|name| !name.is_empty())
        .map(Topic::new)
        .collect::<Result<_, _>>()?;

    let client_id = ClientId::generate();
    let (sink, rx) = MpscSink::channel(state.delivery_buffer);
    let descriptor = state
        .handle
        .register_client(RegisterRequest {
            client_id: client_id.clone(),
            user_id: UserId::from(params.user_id),
            tier,
            connection: ConnectionKind::Sse,
            dashboard_id: params.dashboard_id.map(DashboardId::from),
            sink: Box::new(sink),
        })
        .await?;

    let accepted = state.handle.subscribe(client_id.clone(), topics).await?;
    tracing::debug!(
        client_id = %client_id,
        subscribed = accepted.len(),
        "sse connection established"
    );

    let heartbeat = spawn_heartbeat(state.handle.clone(), client_id.clone(), state.sse_heartbeat);
    let guard = ConnectionGuard {
        handle: state.handle.clone(),
        client_id,
        heartbeat,
    };

    let hello = futures_util::stream::iter([Event::default()
        .event("connected")
        .json_data(&descriptor)]);
    let deliveries = futures_util::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let point = rx.recv().await?;
        let event = Event::default().event("data").json_data(&point);
        Some((event, (rx, guard)))
    });

    Ok(Sse::new(futures_util::StreamExt::chain(hello, deliveries)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

fn spawn_heartbeat(
    handle: DispatcherHandle,
    client_id: ClientId,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if handle.is_closed() {
                break;
            }
            handle.heartbeat(client_id.clone());
        }
    })
}

/// Ties connection lifetime to the stream: dropping the stream stops the
/// heartbeat and unregisters the client.
struct ConnectionGuard {
    handle: DispatcherHandle,
    client_id: ClientId,
    heartbeat: JoinHandle<()>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.heartbeat.abort();
        let handle = self.handle.clone();
        let client_id = self.client_id.clone();
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::spawn(async move {
                handle.unregister_client(client_id).await;
            });
        }
    }
}
