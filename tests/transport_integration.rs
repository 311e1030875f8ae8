//! Transport integration tests
//!
//! Boots the full service (engine, producer, axum router) on an
//! ephemeral port and talks to it over real WebSocket, SSE and HTTP
//! connections.

use futures_util::{SinkExt, StreamExt};
use rankpilot_stream::{DataPoint, DispatcherHandle, StreamServer, StreamerConfig, Topic, UserId};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// ============================================================================
// Test Fixtures
// ============================================================================

/// Start a server with slow synthetic generation so tests publish their
/// own points and assertions stay deterministic.
async fn start_test_server() -> (SocketAddr, DispatcherHandle, StreamServer) {
    let mut config = StreamerConfig::default();
    config.generation.default_interval_ms = 600_000;

    let server = StreamServer::new(config);
    let handle = server.handle();
    let router = server.router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, handle, server)
}

async fn connect(addr: SocketAddr, query: &str) -> WsClient {
    let url = format!("ws://{}/ws?{}", addr, query);
    let (stream, _response) = connect_async(&url).await.expect("Failed to connect");
    stream
}

/// Read frames until one satisfies the predicate, with a timeout guard.
async fn read_frame_where(ws: &mut WsClient, predicate: impl Fn(&Value) -> bool) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("stream closed")
            .expect("message error");

        if let Message::Text(text) = msg {
            let frame: Value = serde_json::from_str(&text).unwrap();
            if predicate(&frame) {
                return frame;
            }
        }
    }
}

fn produced(topic: &str, payload: Value) -> DataPoint {
    DataPoint::external(
        Topic::new(topic).unwrap(),
        UserId::from("u-producer"),
        payload,
    )
}

// ============================================================================
// WebSocket
// ============================================================================

#[tokio::test]
async fn test_websocket_connect_ack_carries_capabilities() {
    let (addr, _handle, _server) = start_test_server().await;
    let mut ws = connect(addr, "user_id=u1&tier=agency").await;

    let ack = read_frame_where(&mut ws, |f| f["stream"] == json!("system-connected")).await;
    assert_eq!(ack["data"]["tier"], json!("agency"));
    assert_eq!(ack["data"]["prefs"]["compression"], json!(true));
    assert_eq!(ack["data"]["prefs"]["delta"], json!(true));
}

#[tokio::test]
async fn test_websocket_subscribe_and_receive() {
    let (addr, handle, _server) = start_test_server().await;
    let mut ws = connect(addr, "user_id=u1&tier=starter").await;

    let subscribe = json!({
        "method": "SUBSCRIBE",
        "id": 1,
        "params": ["seo-metrics"]
    });
    ws.send(Message::Text(subscribe.to_string().into()))
        .await
        .unwrap();

    let reply = read_frame_where(&mut ws, |f| f["id"] == json!(1)).await;
    assert_eq!(reply["result"], json!(["seo-metrics"]));

    handle.publish(produced("seo-metrics", json!({"backlinks": 777})));

    let frame = read_frame_where(&mut ws, |f| f["stream"] == json!("seo-metrics")).await;
    assert_eq!(frame["data"]["payload"]["backlinks"], json!(777));
    assert_eq!(frame["data"]["source"], json!("external"));
}

#[tokio::test]
async fn test_websocket_subscription_cap_reported() {
    let (addr, _handle, _server) = start_test_server().await;
    let mut ws = connect(addr, "user_id=u1&tier=free").await;

    let subscribe = json!({
        "method": "SUBSCRIBE",
        "id": 2,
        "params": ["seo-metrics", "keyword-ranking", "performance", "competitor"]
    });
    ws.send(Message::Text(subscribe.to_string().into()))
        .await
        .unwrap();

    // Free tier caps at three topics; the confirmed list shows the cut
    let reply = read_frame_where(&mut ws, |f| f["id"] == json!(2)).await;
    assert_eq!(
        reply["result"],
        json!(["seo-metrics", "keyword-ranking", "performance"])
    );
}

#[tokio::test]
async fn test_websocket_connection_quota_refused_with_code() {
    let (addr, _handle, _server) = start_test_server().await;

    let mut first = connect(addr, "user_id=quota-user&tier=free").await;
    read_frame_where(&mut first, |f| f["stream"] == json!("system-connected")).await;

    let mut second = connect(addr, "user_id=quota-user&tier=free").await;
    let error = read_frame_where(&mut second, |f| f.get("code").is_some()).await;
    assert_eq!(error["code"], json!(4290));
}

#[tokio::test]
async fn test_websocket_invalid_tier_refused() {
    let (addr, _handle, _server) = start_test_server().await;

    let mut ws = connect(addr, "user_id=u1&tier=platinum").await;
    let error = read_frame_where(&mut ws, |f| f.get("code").is_some()).await;
    assert_eq!(error["code"], json!(4001));
}

#[tokio::test]
async fn test_websocket_collaboration_reaches_dashboard_peer() {
    let (addr, _handle, _server) = start_test_server().await;

    let mut alice = connect(addr, "user_id=alice&tier=starter&dashboard_id=dash-1").await;
    read_frame_where(&mut alice, |f| f["stream"] == json!("system-connected")).await;

    let mut bob = connect(addr, "user_id=bob&tier=starter&dashboard_id=dash-1").await;
    read_frame_where(&mut bob, |f| f["stream"] == json!("system-connected")).await;

    let collaborate = json!({
        "method": "COLLABORATE",
        "id": 5,
        "action": "cursor",
        "detail": {"x": 3, "y": 9}
    });
    bob.send(Message::Text(collaborate.to_string().into()))
        .await
        .unwrap();
    let ack = read_frame_where(&mut bob, |f| f["id"] == json!(5)).await;
    assert!(ack.get("code").is_none());

    let event = read_frame_where(&mut alice, |f| f["stream"] == json!("user-action")).await;
    assert_eq!(event["data"]["payload"]["action"], json!("cursor"));
    assert_eq!(event["data"]["payload"]["detail"]["x"], json!(3));

    // The originator never hears its own event back
    let echo = timeout(Duration::from_millis(300), async {
        read_frame_where(&mut bob, |f| f["stream"] == json!("user-action")).await
    })
    .await;
    assert!(echo.is_err());
}

#[tokio::test]
async fn test_websocket_disconnect_frees_registration() {
    let (addr, handle, _server) = start_test_server().await;

    let mut ws = connect(addr, "user_id=gone-user&tier=free").await;
    read_frame_where(&mut ws, |f| f["stream"] == json!("system-connected")).await;
    ws.close(None).await.unwrap();

    // The handler unregisters on socket close; poll until it lands
    let mut freed = false;
    for _ in 0..50 {
        if handle.metrics().await.unwrap().registered_clients == 0 {
            freed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(freed, "registration not released after disconnect");
}

// ============================================================================
// SSE
// ============================================================================

#[tokio::test]
async fn test_sse_stream_delivers_published_points() {
    let (addr, handle, _server) = start_test_server().await;

    let url = format!(
        "http://{}/sse?user_id=u1&tier=starter&topics=seo-metrics,performance",
        addr
    );
    let mut response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 200);

    let mut body = String::new();

    // Connected event arrives first
    while !body.contains("event: connected") {
        let chunk = timeout(Duration::from_secs(5), response.chunk())
            .await
            .expect("timeout")
            .unwrap()
            .expect("stream ended");
        body.push_str(&String::from_utf8_lossy(&chunk));
    }

    handle.publish(produced("performance", json!({"speed_score": 61})));

    while !body.contains("speed_score") {
        let chunk = timeout(Duration::from_secs(5), response.chunk())
            .await
            .expect("timeout")
            .unwrap()
            .expect("stream ended");
        body.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(body.contains("event: data"));
}

#[tokio::test]
async fn test_sse_rejects_invalid_tier() {
    let (addr, _handle, _server) = start_test_server().await;

    let url = format!("http://{}/sse?user_id=u1&tier=gold&topics=seo-metrics", addr);
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], json!(4001));
}

// ============================================================================
// REST
// ============================================================================

#[tokio::test]
async fn test_healthz() {
    let (addr, _handle, _server) = start_test_server().await;

    let url = format!("http://{}/healthz", addr);
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_registrations() {
    let (addr, _handle, _server) = start_test_server().await;

    let mut ws = connect(addr, "user_id=u1&tier=enterprise").await;
    read_frame_where(&mut ws, |f| f["stream"] == json!("system-connected")).await;

    let url = format!("http://{}/metrics", addr);
    let body: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body["registered_clients"], json!(1));
    assert_eq!(body["evicted_total"], json!(0));
}
