use crate::domain::{CollaborationAction, StreamError, Topic};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// WebSocket incoming message
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "UPPERCASE")]
pub enum WsRequest {
    /// Subscribe to topics
    Subscribe { id: u64, params: Vec<String> },
    /// Unsubscribe from topics
    Unsubscribe { id: u64, params: Vec<String> },
    /// List this connection's confirmed subscriptions
    #[serde(rename = "LIST_SUBSCRIPTIONS")]
    ListSubscriptions { id: u64 },
    /// Application-level liveness ping
    Heartbeat { id: u64 },
    /// Collaboration action for this connection's dashboard
    Collaborate {
        id: u64,
        action: CollaborationAction,
        #[serde(default)]
        detail: Value,
    },
}

/// WebSocket response message
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WsResponse {
    /// Response to a request
    Result {
        id: u64,
        result: Option<serde_json::Value>,
    },
    /// Stream data
    Stream {
        stream: String,
        data: serde_json::Value,
    },
    /// Error response
    Error {
        id: Option<u64>,
        code: i32,
        msg: String,
    },
}

impl WsResponse {
    pub fn ok(id: u64) -> Self {
        WsResponse::Result { id, result: None }
    }

    pub fn topics(id: u64, topics: &[Topic]) -> Self {
        let names: Vec<&str> = topics.iter().map(Topic::as_str).collect();
        WsResponse::Result {
            id,
            result: Some(serde_json::json!(names)),
        }
    }

    pub fn subscriptions(id: u64, subs: Vec<String>) -> Self {
        WsResponse::Result {
            id,
            result: Some(serde_json::json!(subs)),
        }
    }

    pub fn error(id: Option<u64>, code: i32, msg: impl Into<String>) -> Self {
        WsResponse::Error {
            id,
            code,
            msg: msg.into(),
        }
    }

    pub fn stream_error(id: Option<u64>, error: &StreamError) -> Self {
        Self::error(id, error_code(error), error.to_string())
    }
}

/// Wire code for each taxonomy entry.
pub fn error_code(error: &StreamError) -> i32 {
    match error {
        StreamError::QuotaExceeded { .. } => 4290,
        StreamError::InvalidTier(_) => 4001,
        StreamError::InvalidTopic(_) => 4002,
        StreamError::ClientNotFound(_) => 4040,
        StreamError::DuplicateClient(_) => 4090,
        StreamError::EngineClosed => 5030,
    }
}
