use std::sync::Arc;

use crate::errors::NabiiError;
use crate::push::PushProvider;
use crate::session::Session;

#[derive(Clone, Debug)]
pub struct NotificationV1 {
    session: Session,
}

impl NotificationV1 {
    pub(crate) const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Device token registered with the service, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.session.push_token()
    }

    /// The push provider, to manage notification listeners. Only available
    /// once notifications are enabled.
    pub fn provider(&self) -> Result<Arc<dyn PushProvider>, NabiiError> {
        self.session.push_provider()
    }

    /// Allows push notifications. When logged in the device is registered
    /// right away, otherwise on the next login.
    pub async fn enable(&self) -> Result<(), NabiiError> {
        self.session.set_allow_push(true);
        if self.session.is_logged_in() {
            self.session.enable_push().await?;
        }
        Ok(())
    }

    pub async fn disable(&self) -> Result<(), NabiiError> {
        self.session.set_allow_push(false);
        if self.session.is_logged_in() {
            self.session.disable_push().await?;
        }
        Ok(())
    }
}
