pub mod rest;
pub mod sse;
pub mod websocket;

pub use rest::{ApiError, AppState, create_router};
pub use sse::sse_handler;
pub use websocket::{WsRequest, WsResponse, ws_handler};
