mod handler;
mod message;

pub use handler::{ConnectParams, ws_handler};
pub use message::{WsRequest, WsResponse, error_code};
