use chrono::Utc;
use nabii_primitives::common::Platform;
use nabii_primitives::realtime::{PingPayload, PING};
use serde_json::Value;

use crate::errors::{ErrorKind, NabiiError};
use crate::guard::Guard;
use crate::realtime::SocketHandler;
use crate::session::Session;

#[derive(Clone, Debug)]
pub struct SocketV1 {
    session: Session,
}

impl SocketV1 {
    pub(crate) const fn new(session: Session) -> Self {
        Self { session }
    }

    pub async fn emit(&self, event: &str, data: Value) -> Result<(), NabiiError> {
        self.session
            .guarded(Guard::NONE.platform(Platform::Application), || {
                self.session.emit(event, data.clone())
            })
            .await
    }

    /// Emits `ping`; the service answers with `pong`.
    pub async fn ping(&self) -> Result<(), NabiiError> {
        let payload = serde_json::to_value(PingPayload { now: Utc::now() }).map_err(|err| {
            self.session.error(ErrorKind::Realtime {
                reason: err.to_string(),
            })
        })?;
        self.emit(PING, payload).await
    }

    pub async fn on(&self, event: &str, handler: SocketHandler) {
        self.session.on_realtime(event, handler).await;
    }

    /// Removes `handler`, or every handler of `event` when `None`.
    pub async fn off(&self, event: &str, handler: Option<&SocketHandler>) {
        self.session.off_realtime(event, handler).await;
    }

    /// Connected, logged in and on the application platform.
    pub async fn is_logged_in(&self) -> bool {
        self.session.realtime_connected().await
            && self.session.is_logged_in()
            && self.session.platform() == Platform::Application
    }

    pub async fn enable(&self) -> Result<(), NabiiError> {
        self.session.enable_realtime().await
    }

    pub async fn disable(&self) {
        self.session.disable_realtime().await;
    }
}
