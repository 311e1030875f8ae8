use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{
    ClientId, CollaborationEvent, ConnectionKind, DashboardId, StreamError, Tier, Topic, UserId,
};
use crate::infrastructure::{MpscSink, RegisterRequest};
use crate::presentation::rest::AppState;

use super::message::{WsRequest, WsResponse};

/// Query parameters for a WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub user_id: String,
    pub tier: String,
    #[serde(default)]
    pub dashboard_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Handle WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, params: ConnectParams) {
    let (mut sender, mut receiver) = socket.split();

    let tier: Tier = match params.tier.parse() {
        Ok(tier) => tier,
        Err(e) => {
            send_frame(&mut sender, &WsResponse::stream_error(None, &e)).await;
            return;
        }
    };

    let client_id = params
        .client_id
        .map(ClientId::from)
        .unwrap_or_else(ClientId::generate);
    let user_id = UserId::from(params.user_id);
    let dashboard_id = params.dashboard_id.map(DashboardId::from);

    let (sink, mut deliveries) = MpscSink::channel(state.delivery_buffer);
    let request = RegisterRequest {
        client_id: client_id.clone(),
        user_id: user_id.clone(),
        tier,
        connection: ConnectionKind::WebSocket,
        dashboard_id: dashboard_id.clone(),
        sink: Box::new(sink),
    };

    let descriptor = match state.handle.register_client(request).await {
        Ok(descriptor) => descriptor,
        Err(e) => {
            send_frame(&mut sender, &WsResponse::stream_error(None, &e)).await;
            return;
        }
    };

    // Control replies and stream data share one writer task
    let (out_tx, mut out_rx) = tokio::sync::mpsc::channel::<String>(state.delivery_buffer);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Forward engine deliveries to the socket
    let forward_tx = out_tx.clone();
    let forward_task = tokio::spawn(async move {
        while let Some(point) = deliveries.recv().await {
            let Ok(data) = serde_json::to_value(&point) else {
                continue;
            };
            let frame = WsResponse::Stream {
                stream: point.topic.to_string(),
                data,
            };
            if let Ok(json) = serde_json::to_string(&frame) {
                if forward_tx.send(json).await.is_err() {
                    break;
                }
            }
        }
    });

    // Connection ack with the tier-derived capabilities
    if let Ok(data) = serde_json::to_value(&descriptor) {
        let frame = WsResponse::Stream {
            stream: "system-connected".to_string(),
            data,
        };
        if let Ok(json) = serde_json::to_string(&frame) {
            let _ = out_tx.send(json).await;
        }
    }

    // Confirmed subscriptions for LIST_SUBSCRIPTIONS; the engine owns the
    // authoritative set, this mirror only serves the listing request
    let mut subscriptions: HashSet<String> = HashSet::new();

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let reply = match serde_json::from_str::<WsRequest>(&text) {
                    Ok(request) => {
                        handle_request(&state, &client_id, &user_id, &dashboard_id, request, &mut subscriptions).await
                    }
                    Err(e) => WsResponse::error(None, 4000, format!("invalid request: {}", e)),
                };
                if let Ok(json) = serde_json::to_string(&reply) {
                    let _ = out_tx.send(json).await;
                }
            }
            Message::Ping(_) | Message::Pong(_) => {
                state.handle.heartbeat(client_id.clone());
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Cleanup: unregistering drops the engine-side sink, which ends the
    // forward task; dropping out_tx then ends the writer
    state.handle.unregister_client(client_id).await;
    drop(out_tx);
    let _ = forward_task.await;
    let _ = send_task.await;
}

async fn handle_request(
    state: &Arc<AppState>,
    client_id: &ClientId,
    user_id: &UserId,
    dashboard_id: &Option<DashboardId>,
    request: WsRequest,
    subscriptions: &mut HashSet<String>,
) -> WsResponse {
    match request {
        WsRequest::Subscribe { id, params } => {
            let topics = match parse_topics(&params) {
                Ok(topics) => topics,
                Err(e) => return WsResponse::stream_error(Some(id), &e),
            };
            match state.handle.subscribe(client_id.clone(), topics).await {
                Ok(accepted) => {
                    for topic in &accepted {
                        subscriptions.insert(topic.to_string());
                    }
                    WsResponse::topics(id, &accepted)
                }
                Err(e) => WsResponse::stream_error(Some(id), &e),
            }
        }
        WsRequest::Unsubscribe { id, params } => {
            let topics = match parse_topics(&params) {
                Ok(topics) => topics,
                Err(e) => return WsResponse::stream_error(Some(id), &e),
            };
            match state.handle.unsubscribe(client_id.clone(), topics).await {
                Ok(removed) => {
                    for topic in &removed {
                        subscriptions.remove(topic.as_str());
                    }
                    WsResponse::topics(id, &removed)
                }
                Err(e) => WsResponse::stream_error(Some(id), &e),
            }
        }
        WsRequest::ListSubscriptions { id } => {
            let mut current: Vec<String> = subscriptions.iter().cloned().collect();
            current.sort();
            WsResponse::subscriptions(id, current)
        }
        WsRequest::Heartbeat { id } => {
            state.handle.heartbeat(client_id.clone());
            WsResponse::ok(id)
        }
        WsRequest::Collaborate { id, action, detail } => match dashboard_id {
            Some(dashboard) => {
                state.handle.broadcast_collaboration(CollaborationEvent::new(
                    dashboard.clone(),
                    user_id.clone(),
                    action,
                    detail,
                ));
                WsResponse::ok(id)
            }
            None => WsResponse::error(Some(id), 4003, "connection has no dashboard scope"),
        },
    }
}

fn parse_topics(names: &[String]) -> Result<Vec<Topic>, StreamError> {
    names.iter().map(|name| Topic::new(name.as_str())).collect()
}

async fn send_frame(sender: &mut SplitSink<WebSocket, Message>, frame: &WsResponse) {
    if let Ok(json) = serde_json::to_string(frame) {
        let _ = sender.send(Message::Text(json.into())).await;
    }
}
