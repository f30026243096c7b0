//! Realtime connection abstraction.
//!
//! The session owns exactly one [`RealtimeTransport`] handle at a time and
//! keeps its auth payload in step with the HTTP credentials. Handles are
//! created by a [`RealtimeConnector`], which is swapped out in tests.

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use nabii_primitives::common::Platform;
use thiserror::Error;

pub mod websocket;

pub use websocket::{WebSocketConnector, WebSocketTransport};

/// Authentication carried by the connection handshake.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RealtimeAuth {
    /// `Bearer <token>`, once the session has an access token.
    pub token: Option<String>,
    pub platform: Platform,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("connection closed before it was acknowledged")]
    Closed,
    #[error("not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    Send(String),
}

type HandlerFn = dyn Fn(serde_json::Value) + Send + Sync;

/// Callback for one realtime event. Clones share identity.
#[derive(Clone)]
pub struct SocketHandler(Arc<HandlerFn>);

impl SocketHandler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn call(&self, data: serde_json::Value) {
        (self.0)(data);
    }
}

impl fmt::Debug for SocketHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SocketHandler")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

#[async_trait]
pub trait RealtimeTransport: Send + Sync + fmt::Debug {
    fn auth(&self) -> &RealtimeAuth;

    /// Replaces the payload used by the next handshake.
    fn set_auth(&mut self, auth: RealtimeAuth);

    fn is_connected(&self) -> bool;

    /// Resolves once the server acknowledged the connection.
    async fn connect(&mut self) -> Result<(), RealtimeError>;

    /// Resolves once the transport confirmed the disconnection.
    async fn disconnect(&mut self);

    async fn emit(&self, event: &str, data: serde_json::Value) -> Result<(), RealtimeError>;

    fn on(&mut self, event: &str, handler: SocketHandler);

    /// Removes `handler` from `event`, or every handler of `event` when `None`.
    fn off(&mut self, event: &str, handler: Option<&SocketHandler>);

    fn off_all(&mut self);
}

pub trait RealtimeConnector: Send + Sync + fmt::Debug {
    /// Creates a disconnected handle for the service at `url`.
    fn open(&self, url: &str, auth: RealtimeAuth) -> Box<dyn RealtimeTransport>;
}
