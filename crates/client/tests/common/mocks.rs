//! In-memory realtime transport and push provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nabii_client::{
    PushPermission, PushProvider, RealtimeAuth, RealtimeConnector, RealtimeError,
    RealtimeTransport, SocketHandler,
};
use parking_lot::Mutex;
use serde_json::Value;

/// Everything the fake transports observed, shared across handles.
#[derive(Debug, Default)]
pub struct RealtimeLog {
    pub opened: Vec<String>,
    pub auth: Option<RealtimeAuth>,
    pub connects: usize,
    pub disconnects: usize,
    pub off_all: usize,
    pub emitted: Vec<(String, Value)>,
    pub fail_connect: bool,
}

#[derive(Clone, Debug, Default)]
pub struct FakeConnector {
    pub log: Arc<Mutex<RealtimeLog>>,
}

impl FakeConnector {
    pub fn failing() -> Self {
        let connector = Self::default();
        connector.log.lock().fail_connect = true;
        connector
    }
}

impl RealtimeConnector for FakeConnector {
    fn open(&self, url: &str, auth: RealtimeAuth) -> Box<dyn RealtimeTransport> {
        self.log.lock().opened.push(url.to_owned());
        Box::new(FakeTransport {
            log: Arc::clone(&self.log),
            auth,
            connected: false,
            handlers: HashMap::new(),
        })
    }
}

#[derive(Debug)]
pub struct FakeTransport {
    log: Arc<Mutex<RealtimeLog>>,
    auth: RealtimeAuth,
    connected: bool,
    handlers: HashMap<String, Vec<SocketHandler>>,
}

#[async_trait]
impl RealtimeTransport for FakeTransport {
    fn auth(&self) -> &RealtimeAuth {
        &self.auth
    }

    fn set_auth(&mut self, auth: RealtimeAuth) {
        self.log.lock().auth = Some(auth.clone());
        self.auth = auth;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), RealtimeError> {
        if self.connected {
            return Ok(());
        }
        let mut log = self.log.lock();
        if log.fail_connect {
            return Err(RealtimeError::Connect("connection refused".to_owned()));
        }
        log.connects += 1;
        drop(log);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.log.lock().disconnects += 1;
    }

    async fn emit(&self, event: &str, data: Value) -> Result<(), RealtimeError> {
        if !self.connected {
            return Err(RealtimeError::NotConnected);
        }
        self.log.lock().emitted.push((event.to_owned(), data));
        Ok(())
    }

    fn on(&mut self, event: &str, handler: SocketHandler) {
        self.handlers
            .entry(event.to_owned())
            .or_default()
            .push(handler);
    }

    fn off(&mut self, event: &str, handler: Option<&SocketHandler>) {
        match handler {
            Some(handler) => {
                if let Some(handlers) = self.handlers.get_mut(event) {
                    handlers.retain(|candidate| !candidate.ptr_eq(handler));
                }
            }
            None => {
                let _removed = self.handlers.remove(event);
            }
        }
    }

    fn off_all(&mut self) {
        self.handlers.clear();
        self.log.lock().off_all += 1;
    }
}

#[derive(Clone, Debug)]
pub struct FakePush {
    pub permission: PushPermission,
    pub fail: bool,
    pub token: String,
}

impl FakePush {
    pub fn granted() -> Self {
        Self {
            permission: PushPermission::Granted,
            fail: false,
            token: "device-token".to_owned(),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PushPermission::Denied,
            ..Self::granted()
        }
    }

    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::granted()
        }
    }
}

#[async_trait]
impl PushProvider for FakePush {
    async fn request_permission(&self) -> eyre::Result<PushPermission> {
        if self.fail {
            eyre::bail!("push notifications are not implemented on this platform");
        }
        Ok(self.permission)
    }

    async fn register(&self) -> eyre::Result<()> {
        Ok(())
    }

    async fn token(&self) -> eyre::Result<String> {
        Ok(self.token.clone())
    }

    async fn remove_all_listeners(&self) -> eyre::Result<()> {
        Ok(())
    }
}
