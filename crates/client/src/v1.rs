//! Version 1 of the service API.

use std::sync::Arc;

use nabii_primitives::common::{Language, Mode};
use reqwest::Client;

use crate::config::ClientOptions;
use crate::errors::NabiiError;
use crate::events::{ErrorHook, EventKind, Listener};
use crate::push::PushProvider;
use crate::realtime::{RealtimeConnector, WebSocketConnector};
use crate::session::Session;

pub mod auth;
pub mod notification;
pub mod socket;
pub mod user;
pub mod version;

pub use auth::AuthV1;
pub use notification::NotificationV1;
pub use socket::SocketV1;
pub use user::{AdminUserV1, UserV1};
pub use version::{AdminVersionV1, VersionV1};

/// Every resource module of the API, sharing one session.
#[derive(Clone, Debug)]
pub struct NabiiV1 {
    session: Session,
    pub auth: AuthV1,
    pub user: UserV1,
    pub version: VersionV1,
    pub notification: NotificationV1,
    pub socket: SocketV1,
}

impl NabiiV1 {
    #[must_use]
    pub fn builder() -> NabiiV1Builder {
        NabiiV1Builder::default()
    }

    fn new(session: Session) -> Self {
        Self {
            auth: AuthV1::new(session.clone()),
            user: UserV1::new(session.clone()),
            version: VersionV1::new(session.clone()),
            notification: NotificationV1::new(session.clone()),
            socket: SocketV1::new(session.clone()),
            session,
        }
    }

    /// Underlying session, for resource modules written outside this crate.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the service answered at the current URL.
    pub async fn resolve(&self) -> bool {
        self.session.resolve().await
    }

    /// Replaces the hook observing rejected requests.
    pub fn on_error(&self, hook: ErrorHook) {
        self.session.on_error(hook);
    }

    #[must_use]
    pub fn lang(&self) -> Language {
        self.session.language()
    }

    pub fn set_lang(&self, language: &str) -> Result<(), NabiiError> {
        self.session.set_language(language)
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.session.url()
    }

    pub async fn set_url(&self, url: &str) -> Result<(), NabiiError> {
        self.session.set_url(url).await
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    pub fn set_mode(&self, mode: &str) -> Result<(), NabiiError> {
        self.session.set_mode(mode)
    }

    pub fn add_event_listener(&self, kind: EventKind, listener: Listener) {
        self.session.add_event_listener(kind, listener);
    }

    pub fn remove_event_listener(&self, kind: EventKind, listener: &Listener) -> bool {
        self.session.remove_event_listener(kind, listener)
    }

    #[must_use]
    pub fn list_event_listeners(&self, kind: EventKind) -> Vec<Listener> {
        self.session.list_event_listeners(kind)
    }
}

#[derive(Debug, Default)]
pub struct NabiiV1Builder {
    options: ClientOptions,
    connector: Option<Arc<dyn RealtimeConnector>>,
    push: Option<Arc<dyn PushProvider>>,
    http: Option<Client>,
}

impl NabiiV1Builder {
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.options.url = url.into();
        self
    }

    #[must_use]
    pub const fn language(mut self, language: Language) -> Self {
        self.options.language = language;
        self
    }

    #[must_use]
    pub const fn mode(mut self, mode: Mode) -> Self {
        self.options.mode = mode;
        self
    }

    #[must_use]
    pub fn connector(mut self, connector: impl RealtimeConnector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    #[must_use]
    pub fn push_provider(mut self, provider: impl PushProvider + 'static) -> Self {
        self.push = Some(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Fails when the configured URL is not an absolute URL.
    pub fn build(self) -> Result<NabiiV1, NabiiError> {
        let connector = self.connector.unwrap_or_else(|| {
            Arc::new(WebSocketConnector::new(self.options.realtime_path.clone()))
        });
        let http = self.http.unwrap_or_default();

        let session = Session::new(&self.options, http, connector, self.push)?;
        Ok(NabiiV1::new(session))
    }
}

/// Entry point. Each field is one version of the API.
#[derive(Clone, Debug)]
pub struct Nabii {
    pub v1: NabiiV1,
}

impl Nabii {
    pub fn new(options: ClientOptions) -> Result<Self, NabiiError> {
        Ok(Self {
            v1: NabiiV1::builder().options(options).build()?,
        })
    }
}
