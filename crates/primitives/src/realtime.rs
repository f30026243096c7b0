//! Events exchanged over the realtime connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Emitted once the server accepted the connection handshake.
pub const CONNECT_SUCCESS: &str = "connect_success";
/// Emitted when the underlying transport is established.
pub const CONNECT: &str = "connect";
/// Emitted when the connection attempt failed.
pub const CONNECT_ERROR: &str = "connect_error";
/// Emitted when the connection is closed, by either side.
pub const DISCONNECT: &str = "disconnect";
pub const PING: &str = "ping";
pub const PONG: &str = "pong";

/// One text frame on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPayload {
    pub now: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongPayload {
    pub response_time: u64,
}
