//! WebSocket implementation of the realtime transport.
//!
//! Frames are JSON text messages `{"event": ..., "data": ...}`. The handshake
//! carries the session bearer token and platform as headers, and the
//! connection only counts as established once the server sent
//! `connect_success`.

use core::time::Duration;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, Stream, StreamExt};
use nabii_primitives::realtime::{Frame, CONNECT, CONNECT_ERROR, CONNECT_SUCCESS, DISCONNECT};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, warn};

use super::{RealtimeAuth, RealtimeConnector, RealtimeError, RealtimeTransport, SocketHandler};

const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CLIENT_DISCONNECT: &str = "io client disconnect";
const SERVER_DISCONNECT: &str = "io server disconnect";

type Handlers = Arc<RwLock<HashMap<String, Vec<SocketHandler>>>>;

#[derive(Clone, Debug)]
pub struct WebSocketConnector {
    path: String,
}

impl WebSocketConnector {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new("/socket")
    }
}

impl RealtimeConnector for WebSocketConnector {
    fn open(&self, url: &str, auth: RealtimeAuth) -> Box<dyn RealtimeTransport> {
        Box::new(WebSocketTransport::new(endpoint(url, &self.path), auth))
    }
}

#[derive(Debug)]
struct Link {
    outgoing: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct WebSocketTransport {
    endpoint: String,
    auth: RealtimeAuth,
    handlers: Handlers,
    link: Option<Link>,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new(endpoint: String, auth: RealtimeAuth) -> Self {
        Self {
            endpoint,
            auth,
            handlers: Arc::default(),
            link: None,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self) -> Result<Request, RealtimeError> {
        let mut request = self
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|err| RealtimeError::Connect(err.to_string()))?;

        let headers = request.headers_mut();
        if let Some(token) = &self.auth.token {
            let value = HeaderValue::from_str(token)
                .map_err(|err| RealtimeError::Connect(err.to_string()))?;
            let _previous = headers.insert("authorization", value);
        }
        let _previous = headers.insert(
            "platform",
            HeaderValue::from_static(self.auth.platform.as_str()),
        );

        Ok(request)
    }

    fn fail(&self, err: RealtimeError) -> RealtimeError {
        dispatch(&self.handlers, CONNECT_ERROR, Value::String(err.to_string()));
        err
    }
}

#[async_trait]
impl RealtimeTransport for WebSocketTransport {
    fn auth(&self) -> &RealtimeAuth {
        &self.auth
    }

    fn set_auth(&mut self, auth: RealtimeAuth) {
        self.auth = auth;
    }

    fn is_connected(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| link.connected.load(Ordering::SeqCst))
    }

    async fn connect(&mut self) -> Result<(), RealtimeError> {
        if self.is_connected() {
            return Ok(());
        }

        let request = self.request()?;
        debug!(endpoint = %self.endpoint, "Opening realtime connection");

        let (socket, _response) = connect_async(request)
            .await
            .map_err(|err| self.fail(RealtimeError::Connect(err.to_string())))?;
        dispatch(&self.handlers, CONNECT, Value::Null);

        let (mut sink, mut stream) = socket.split();

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<Frame>(&text) {
                    Ok(frame) if frame.event == CONNECT_SUCCESS => {
                        dispatch(&self.handlers, CONNECT_SUCCESS, frame.data);
                        break;
                    }
                    Ok(frame) => dispatch(&self.handlers, &frame.event, frame.data),
                    Err(err) => debug!(%err, "Ignoring malformed realtime frame"),
                },
                Some(Ok(Message::Close(_))) | None => return Err(self.fail(RealtimeError::Closed)),
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(self.fail(RealtimeError::Connect(err.to_string()))),
            }
        }

        let (outgoing, mut queue) = mpsc::unbounded_channel::<Message>();
        drop(tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                let is_close = matches!(message, Message::Close(_));
                if let Err(err) = sink.send(message).await {
                    debug!(%err, "Realtime writer stopped");
                    break;
                }
                if is_close {
                    break;
                }
            }
        }));

        let connected = Arc::new(AtomicBool::new(true));
        let closing = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(
            stream,
            Arc::clone(&self.handlers),
            Arc::clone(&connected),
            Arc::clone(&closing),
        ));

        self.link = Some(Link {
            outgoing,
            reader,
            connected,
            closing,
        });

        debug!(endpoint = %self.endpoint, "Realtime connection acknowledged");
        Ok(())
    }

    async fn disconnect(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };

        link.closing.store(true, Ordering::SeqCst);
        if link.outgoing.send(Message::Close(None)).is_err() {
            debug!("Realtime writer already stopped");
        }

        let mut reader = link.reader;
        if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut reader)
            .await
            .is_err()
        {
            warn!("Realtime connection did not confirm disconnection in time");
            reader.abort();
            link.connected.store(false, Ordering::SeqCst);
            dispatch(&self.handlers, DISCONNECT, Value::from(CLIENT_DISCONNECT));
        }
    }

    async fn emit(&self, event: &str, data: Value) -> Result<(), RealtimeError> {
        let link = self
            .link
            .as_ref()
            .filter(|link| link.connected.load(Ordering::SeqCst))
            .ok_or(RealtimeError::NotConnected)?;

        let frame = Frame {
            event: event.to_owned(),
            data,
        };
        let text =
            serde_json::to_string(&frame).map_err(|err| RealtimeError::Send(err.to_string()))?;

        link.outgoing
            .send(Message::Text(text))
            .map_err(|_| RealtimeError::NotConnected)
    }

    fn on(&mut self, event: &str, handler: SocketHandler) {
        self.handlers
            .write()
            .entry(event.to_owned())
            .or_default()
            .push(handler);
    }

    fn off(&mut self, event: &str, handler: Option<&SocketHandler>) {
        let mut handlers = self.handlers.write();
        match handler {
            Some(handler) => {
                if let Some(registered) = handlers.get_mut(event) {
                    registered.retain(|candidate| !candidate.ptr_eq(handler));
                }
            }
            None => {
                let _removed = handlers.remove(event);
            }
        }
    }

    fn off_all(&mut self) {
        self.handlers.write().clear();
    }
}

async fn read_loop<S>(
    mut stream: S,
    handlers: Handlers,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
) where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<Frame>(&text) {
                Ok(frame) => dispatch(&handlers, &frame.event, frame.data),
                Err(err) => debug!(%err, "Ignoring malformed realtime frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "Realtime connection dropped");
                break;
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    let reason = if closing.load(Ordering::SeqCst) {
        CLIENT_DISCONNECT
    } else {
        SERVER_DISCONNECT
    };
    dispatch(&handlers, DISCONNECT, Value::from(reason));
}

fn dispatch(handlers: &Handlers, event: &str, data: Value) {
    let registered = handlers.read().get(event).cloned().unwrap_or_default();
    for handler in registered {
        handler.call(data.clone());
    }
}

/// Maps the HTTP base URL onto the realtime endpoint.
fn endpoint(url: &str, path: &str) -> String {
    let base = if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_owned()
    };
    format!("{base}{path}")
}

#[cfg(test)]
mod tests {
    use nabii_primitives::common::Platform;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc::unbounded_channel;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{
        ErrorResponse as HandshakeRejection, Request, Response,
    };

    use super::*;

    #[test]
    fn test_endpoint() {
        assert_eq!(
            endpoint("https://api.nabii.com", "/socket"),
            "wss://api.nabii.com/socket"
        );
        assert_eq!(
            endpoint("http://localhost:1338", "/socket"),
            "ws://localhost:1338/socket"
        );
    }

    #[test]
    fn test_off_removes_by_identity() {
        let mut transport = WebSocketTransport::new("ws://localhost".to_owned(), RealtimeAuth::default());
        let kept = SocketHandler::new(|_| {});
        let removed = SocketHandler::new(|_| {});
        transport.on("pong", kept.clone());
        transport.on("pong", removed.clone());

        transport.off("pong", Some(&removed));
        let handlers = transport.handlers.read().get("pong").cloned().unwrap();
        assert_eq!(handlers.len(), 1);
        assert!(handlers[0].ptr_eq(&kept));

        transport.off("pong", None);
        assert!(transport.handlers.read().get("pong").is_none());
    }

    #[tokio::test]
    async fn test_connect_error_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport =
            WebSocketTransport::new(format!("ws://{addr}/socket"), RealtimeAuth::default());
        let (tx, mut rx) = unbounded_channel();
        transport.on(
            CONNECT_ERROR,
            SocketHandler::new(move |data| {
                let _ignored = tx.send(data);
            }),
        );

        let result = transport.connect().await;
        assert!(matches!(result, Err(RealtimeError::Connect(_))));
        assert!(!transport.is_connected());
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_connect_emit_and_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut authorization = None;
            let callback = |request: &Request,
                            response: Response|
             -> Result<Response, HandshakeRejection> {
                authorization = request
                    .headers()
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned);
                Ok(response)
            };
            let mut ws = accept_hdr_async(tcp, callback).await.unwrap();

            let ack = json!({ "event": "connect_success", "data": null });
            ws.send(Message::Text(ack.to_string())).await.unwrap();

            while let Some(Ok(message)) = ws.next().await {
                if let Message::Text(text) = message {
                    let frame: Frame = serde_json::from_str(&text).unwrap();
                    if frame.event == "ping" {
                        let pong = json!({ "event": "pong", "data": { "responseTime": 3 } });
                        ws.send(Message::Text(pong.to_string())).await.unwrap();
                    }
                }
            }

            authorization
        });

        let mut transport = WebSocketTransport::new(
            format!("ws://{addr}/socket"),
            RealtimeAuth {
                token: Some("Bearer abc".to_owned()),
                platform: Platform::Application,
            },
        );

        let (tx, mut rx) = unbounded_channel();
        let pong_tx = tx.clone();
        transport.on(
            "pong",
            SocketHandler::new(move |data| {
                let _ignored = pong_tx.send(("pong", data));
            }),
        );
        transport.on(
            DISCONNECT,
            SocketHandler::new(move |data| {
                let _ignored = tx.send(("disconnect", data));
            }),
        );

        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        // Already connected: resolves immediately.
        transport.connect().await.unwrap();

        transport.emit("ping", json!({ "now": "2024-01-01T00:00:00Z" })).await.unwrap();
        let (event, data) = rx.recv().await.unwrap();
        assert_eq!(event, "pong");
        assert_eq!(data, json!({ "responseTime": 3 }));

        transport.disconnect().await;
        assert!(!transport.is_connected());
        let (event, data) = rx.recv().await.unwrap();
        assert_eq!(event, "disconnect");
        assert_eq!(data, json!(CLIENT_DISCONNECT));

        // Already disconnected: nothing left to do.
        transport.disconnect().await;

        assert_eq!(server.await.unwrap().as_deref(), Some("Bearer abc"));
    }
}
