//! Session lifecycle: credentials, refresh-then-retry, realtime sync and
//! event dispatch.
//!
//! A [`Session`] is cheap to clone; every resource module holds one and
//! they all share the same state. Synchronous state lives behind
//! `parking_lot` locks that are never held across an await point. The
//! realtime handle sits behind an async mutex because connecting and
//! disconnecting suspend.
//!
//! State machine:
//!
//! ```text
//! Anonymous --login / set_credentials--> Authenticated
//! Authenticated --401 / refresh()--> Refreshing --ok--> Authenticated
//!                                    Refreshing --err--> Anonymous
//! Authenticated --logout--> Anonymous
//! ```

use core::future::Future;
use std::sync::Arc;

use nabii_primitives::auth::{LoginRequest, RefreshRequest};
use nabii_primitives::common::{Language, Mode, Platform};
use nabii_primitives::credentials::{Credentials, PartialCredentials, RefreshTokenResult};
use nabii_primitives::user::Role;
use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{normalize_url, ClientOptions, SessionConfig, LIVENESS_PATH};
use crate::connection::{decode, Connection, RequestContext, RequestType};
use crate::errors::{ErrorKind, NabiiError};
use crate::events::{ErrorHook, EventKind, EventListeners, Listener, SessionEvent};
use crate::guard::Guard;
use crate::push::{PushPermission, PushProvider};
use crate::realtime::{RealtimeAuth, RealtimeConnector, RealtimeTransport, SocketHandler};

#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: RwLock<SessionConfig>,
    connection: Connection,
    listeners: RwLock<EventListeners>,
    error_hook: RwLock<Option<ErrorHook>>,
    realtime: Mutex<Box<dyn RealtimeTransport>>,
    connector: Arc<dyn RealtimeConnector>,
    push: Option<Arc<dyn PushProvider>>,
    /// Serialises refreshes so concurrent 401s trigger a single one.
    refresh_gate: Mutex<()>,
}

impl Session {
    pub(crate) fn new(
        options: &ClientOptions,
        http: Client,
        connector: Arc<dyn RealtimeConnector>,
        push: Option<Arc<dyn PushProvider>>,
    ) -> Result<Self, NabiiError> {
        let url = normalize_url(&options.url).ok_or_else(|| {
            NabiiError::new(
                ErrorKind::InvalidUrl {
                    url: options.url.clone(),
                },
                options.language,
            )
        })?;

        let config = SessionConfig::new(url, options);
        let realtime = connector.open(
            &config.url,
            RealtimeAuth {
                token: None,
                platform: config.platform,
            },
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config: RwLock::new(config),
                connection: Connection::new(http),
                listeners: RwLock::default(),
                error_hook: RwLock::default(),
                realtime: Mutex::new(realtime),
                connector,
                push,
                refresh_gate: Mutex::new(()),
            }),
        })
    }

    /// Builds an error whose message uses the current session language.
    pub(crate) fn error(&self, kind: ErrorKind) -> NabiiError {
        NabiiError::new(kind, self.language())
    }

    fn invalid_credentials(&self, reason: impl ToString) -> NabiiError {
        self.error(ErrorKind::InvalidCredentials {
            reason: reason.to_string(),
        })
    }

    // Configuration

    #[must_use]
    pub fn url(&self) -> String {
        self.inner.config.read().url.clone()
    }

    /// Changes the base URL and rebuilds the realtime handle against it.
    ///
    /// Fails without touching the current URL when `url` is not an absolute
    /// URL. A failure to reconnect the realtime channel is logged only.
    pub async fn set_url(&self, url: &str) -> Result<(), NabiiError> {
        let Some(normalized) = normalize_url(url) else {
            return Err(self.error(ErrorKind::InvalidUrl {
                url: url.to_owned(),
            }));
        };

        self.inner.config.write().url.clone_from(&normalized);
        info!(url = %normalized, "Base URL changed");

        if let Err(err) = self.reset_realtime().await {
            warn!(%err, "Failed to restore the realtime connection after a URL change");
        }

        Ok(())
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.inner.config.read().language
    }

    pub fn set_language(&self, language: &str) -> Result<(), NabiiError> {
        let parsed = language.parse::<Language>().map_err(|_| {
            self.error(ErrorKind::InvalidLanguage {
                language: language.to_owned(),
            })
        })?;
        self.inner.config.write().language = parsed;
        Ok(())
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.inner.config.read().mode
    }

    pub fn set_mode(&self, mode: &str) -> Result<(), NabiiError> {
        let parsed = mode.parse::<Mode>().map_err(|_| {
            self.error(ErrorKind::InvalidMode {
                mode: mode.to_owned(),
            })
        })?;
        self.inner.config.write().mode = parsed;
        Ok(())
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.inner.config.read().platform
    }

    pub fn set_platform(&self, platform: Platform) {
        self.inner.config.write().platform = platform;
    }

    // Credentials

    /// The current credentials, or `None` for the empty credential set.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        self.inner.config.read().credentials()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.inner.config.read().is_logged_in
    }

    /// The access token, only while logged in.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        let config = self.inner.config.read();
        if !config.is_logged_in {
            return None;
        }
        config.credentials.access_token.clone()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        let config = self.inner.config.read();
        config.is_logged_in
            && config.platform == Platform::Application
            && config
                .credentials
                .user
                .as_ref()
                .is_some_and(|user| user.role == Role::Admin)
    }

    // Events

    pub fn add_event_listener(&self, kind: EventKind, listener: Listener) {
        self.inner.listeners.write().add(kind, listener);
    }

    pub fn remove_event_listener(&self, kind: EventKind, listener: &Listener) -> bool {
        self.inner.listeners.write().remove(kind, listener)
    }

    #[must_use]
    pub fn list_event_listeners(&self, kind: EventKind) -> Vec<Listener> {
        self.inner.listeners.read().list(kind)
    }

    /// Replaces the error hook.
    pub fn on_error(&self, hook: ErrorHook) {
        *self.inner.error_hook.write() = Some(hook);
    }

    /// Runs the listeners of `event` in registration order. The first
    /// failure stops the dispatch.
    async fn dispatch(&self, event: SessionEvent) -> Result<(), NabiiError> {
        let kind = event.kind();
        let listeners = self.inner.listeners.read().list(kind);
        debug!(event = %kind, count = listeners.len(), "Dispatching session event");

        for listener in listeners {
            listener.call(event.clone()).await.map_err(|report| {
                self.error(ErrorKind::Listener {
                    event: kind,
                    reason: report.to_string(),
                })
            })?;
        }

        Ok(())
    }

    // HTTP

    fn request_context(&self) -> RequestContext {
        let config = self.inner.config.read();
        RequestContext {
            base_url: config.url.clone(),
            bearer: config
                .credentials
                .access_token
                .as_ref()
                .map(|token| format!("Bearer {token}")),
            language: config.language,
            mode: config.mode,
        }
    }

    async fn send<Q, B>(
        &self,
        req_type: RequestType,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<String, NabiiError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let context = self.request_context();
        match self
            .inner
            .connection
            .execute(&context, req_type, path, query, body)
            .await
        {
            Ok(text) => Ok(text),
            Err(kind) => Err(self.observe(self.error(kind)).await),
        }
    }

    /// Hands rejected requests to the error hook. Unauthorized responses
    /// are left to the refresh path and liveness pings are never reported.
    async fn observe(&self, err: NabiiError) -> NabiiError {
        let reportable = matches!(
            err.kind(),
            ErrorKind::Rejected { path, response }
                if response.status != 401 && path != LIVENESS_PATH
        );
        if !reportable {
            return err;
        }

        let hook = self.inner.error_hook.read().clone();
        if let Some(hook) = hook {
            if let Err(report) = hook.call(err.clone()).await {
                warn!(%report, "Error hook failed");
            }
        }

        err
    }

    async fn request<Q, B, O>(
        &self,
        req_type: RequestType,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<O, NabiiError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let text = self.send(req_type, path, query, body).await?;
        decode(path, &text).map_err(|kind| self.error(kind))
    }

    pub async fn get<O: DeserializeOwned>(&self, path: &str) -> Result<O, NabiiError> {
        self.request(RequestType::Get, path, None::<&()>, None::<&()>)
            .await
    }

    pub async fn get_query<Q, O>(&self, path: &str, query: &Q) -> Result<O, NabiiError>
    where
        Q: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        self.request(RequestType::Get, path, Some(query), None::<&()>)
            .await
    }

    /// GET returning the raw body, for non-JSON payloads.
    pub async fn get_text(&self, path: &str) -> Result<String, NabiiError> {
        self.send(RequestType::Get, path, None::<&()>, None::<&()>)
            .await
    }

    pub async fn post<B, O>(&self, path: &str, body: &B) -> Result<O, NabiiError>
    where
        B: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        self.request(RequestType::Post, path, None::<&()>, Some(body))
            .await
    }

    pub async fn patch<B, O>(&self, path: &str, body: &B) -> Result<O, NabiiError>
    where
        B: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        self.request(RequestType::Patch, path, None::<&()>, Some(body))
            .await
    }

    pub async fn patch_empty<O: DeserializeOwned>(&self, path: &str) -> Result<O, NabiiError> {
        self.request(RequestType::Patch, path, None::<&()>, None::<&()>)
            .await
    }

    pub async fn delete<O: DeserializeOwned>(&self, path: &str) -> Result<O, NabiiError> {
        self.request(RequestType::Delete, path, None::<&()>, None::<&()>)
            .await
    }

    /// Pings the liveness path. Any response, even a rejection, counts.
    pub async fn resolve(&self) -> bool {
        match self.get_text(LIVENESS_PATH).await {
            Ok(_) => true,
            Err(err) => err.response().is_some(),
        }
    }

    /// Checks `guard` then runs `call`, retrying it once after a refresh
    /// when it fails with 401 and the guard asks for it.
    pub async fn guarded<T, F, Fut>(&self, guard: Guard, call: F) -> Result<T, NabiiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, NabiiError>>,
    {
        guard.check(self)?;

        if !guard.refresh {
            return call().await;
        }

        let stale = self.inner.config.read().credentials.access_token.clone();
        match call().await {
            Err(err) if err.is_unauthorized() => {
                debug!("Request unauthorized, refreshing session before retrying");
                self.refresh_after_unauthorized(stale.as_deref()).await?;
                call().await
            }
            other => other,
        }
    }

    // Lifecycle

    pub async fn login(&self, email: &str, password: &str) -> Result<Credentials, NabiiError> {
        let request = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let raw: Value = self.post("/auth/login", &request).await?;
        let credentials = Credentials::parse(raw).map_err(|err| self.invalid_credentials(err))?;

        {
            let mut config = self.inner.config.write();
            config.credentials = credentials.clone().into();
            config.is_logged_in = true;
            config.platform = Platform::Application;
        }
        info!(user_id = credentials.user.id, "Logged in");

        if let Err(err) = self.after_login(&credentials).await {
            warn!(%err, "Login side effects failed, logging out");
            self.force_logout().await;
            return Err(err);
        }

        Ok(credentials)
    }

    async fn after_login(&self, credentials: &Credentials) -> Result<(), NabiiError> {
        self.sync_realtime().await?;
        self.dispatch(SessionEvent::Login(credentials.clone()))
            .await?;
        self.check_enable_push().await
    }

    /// Restores a session from stored credentials. Only the supplied fields
    /// are validated; the merged set is then completed by a refresh.
    pub async fn set_credentials(
        &self,
        credentials: PartialCredentials,
    ) -> Result<RefreshTokenResult, NabiiError> {
        let credentials = credentials
            .normalized()
            .map_err(|err| self.invalid_credentials(err))?;

        {
            let mut config = self.inner.config.write();
            config.credentials.overlay(credentials);
            config.platform = Platform::Application;
        }

        let result = self.refresh().await?;
        self.check_enable_push().await?;
        Ok(result)
    }

    /// Exchanges the refresh token for a new access token.
    pub async fn refresh(&self) -> Result<RefreshTokenResult, NabiiError> {
        let exchanged = {
            let _gate = self.inner.refresh_gate.lock().await;
            self.exchange_tokens().await
        };
        self.finish_refresh(exchanged).await
    }

    /// Refresh triggered by a 401. Skipped when another call already
    /// replaced the token that was rejected.
    async fn refresh_after_unauthorized(&self, stale: Option<&str>) -> Result<(), NabiiError> {
        let exchanged = {
            let _gate = self.inner.refresh_gate.lock().await;

            let current = self.inner.config.read().credentials.access_token.clone();
            if self.is_logged_in() && current.is_some() && current.as_deref() != stale {
                debug!("Session already refreshed by a concurrent call");
                return Ok(());
            }

            self.exchange_tokens().await
        };

        let _result = self.finish_refresh(exchanged).await?;
        Ok(())
    }

    /// Calls the refresh route and swaps in the merged credentials. Runs
    /// under the refresh gate, so it must not reach user code.
    async fn exchange_tokens(&self) -> Result<(RefreshTokenResult, Credentials), NabiiError> {
        let (access_token, refresh_token) = {
            let config = self.inner.config.read();
            (
                config.credentials.access_token.clone(),
                config.credentials.refresh_token.clone(),
            )
        };
        let (Some(_), Some(refresh_token)) = (access_token, refresh_token) else {
            return Err(self.error(ErrorKind::MissingCredentials));
        };

        debug!("Refreshing session");
        let result: RefreshTokenResult = self
            .post("/auth/refresh", &RefreshRequest { refresh_token })
            .await?;

        let merged = {
            let mut merged = self.inner.config.read().credentials.clone();
            merged.overlay(result.clone().into());
            merged.complete()
        };
        let credentials = merged.map_err(|reason| self.invalid_credentials(reason))?;

        {
            let mut config = self.inner.config.write();
            config.credentials = credentials.clone().into();
            config.is_logged_in = true;
        }

        Ok((result, credentials))
    }

    /// Side effects of a refresh, run once the gate is released so that
    /// listeners may issue guarded calls of their own.
    async fn finish_refresh(
        &self,
        exchanged: Result<(RefreshTokenResult, Credentials), NabiiError>,
    ) -> Result<RefreshTokenResult, NabiiError> {
        let (result, credentials) = match exchanged {
            Ok(exchanged) => exchanged,
            Err(err) if matches!(err.kind(), ErrorKind::MissingCredentials) => return Err(err),
            Err(err) => {
                warn!(%err, "Session refresh failed, logging out");
                self.force_logout().await;
                return Err(err);
            }
        };

        self.sync_realtime().await?;
        self.dispatch(SessionEvent::Refresh(credentials)).await?;
        info!("Session refreshed");

        Ok(result)
    }

    /// Ends the session. Only application sessions are torn down, but the
    /// `logout` listeners always run.
    pub async fn logout(&self) -> Result<(), NabiiError> {
        let (is_logged_in, platform, allow_push) = {
            let config = self.inner.config.read();
            (config.is_logged_in, config.platform, config.allow_push)
        };

        if is_logged_in && platform == Platform::Application {
            if allow_push {
                if let Err(err) = self.disable_push().await {
                    warn!(%err, "Failed to remove the push token while logging out");
                }
            }

            self.inner.config.write().clear_credentials();

            let mut realtime = self.inner.realtime.lock().await;
            realtime.off_all();
            realtime.disconnect().await;
            drop(realtime);

            info!("Logged out");
        }

        self.dispatch(SessionEvent::Logout).await
    }

    /// Logout after a failed transition. Whatever the platform, the session
    /// ends up without credentials.
    async fn force_logout(&self) {
        if let Err(err) = self.logout().await {
            warn!(%err, "Logout listeners failed during a forced logout");
        }
        self.inner.config.write().clear_credentials();
    }

    /// Local teardown once the account was deleted server side. The push
    /// token went with the account, so no call is made for it.
    pub(crate) async fn close_deleted_account(&self) -> Result<(), NabiiError> {
        let (is_logged_in, platform) = {
            let config = self.inner.config.read();
            (config.is_logged_in, config.platform)
        };
        if !is_logged_in || platform != Platform::Application {
            return Ok(());
        }

        self.inner.config.write().clear_credentials();
        self.inner.realtime.lock().await.disconnect().await;
        info!("Account deleted, session closed");

        self.dispatch(SessionEvent::Logout).await
    }

    // Realtime

    /// Pushes the current bearer token into the realtime handshake and
    /// connects when realtime is allowed.
    async fn sync_realtime(&self) -> Result<(), NabiiError> {
        let (platform, access_token, allow_realtime) = {
            let config = self.inner.config.read();
            (
                config.platform,
                config.credentials.access_token.clone(),
                config.allow_realtime,
            )
        };

        if platform != Platform::Application {
            return Ok(());
        }
        let Some(access_token) = access_token else {
            return Err(self.error(ErrorKind::MissingCredentials));
        };

        let mut realtime = self.inner.realtime.lock().await;
        realtime.set_auth(RealtimeAuth {
            token: Some(format!("Bearer {access_token}")),
            platform,
        });

        if !allow_realtime {
            return Ok(());
        }

        realtime.connect().await.map_err(|err| {
            self.error(ErrorKind::Realtime {
                reason: err.to_string(),
            })
        })
    }

    async fn reset_realtime(&self) -> Result<(), NabiiError> {
        let (url, platform) = {
            let config = self.inner.config.read();
            (config.url.clone(), config.platform)
        };

        let mut realtime = self.inner.realtime.lock().await;
        if realtime.is_connected() {
            realtime.disconnect().await;
        }
        *realtime = self.inner.connector.open(
            &url,
            RealtimeAuth {
                token: None,
                platform,
            },
        );
        drop(realtime);
        debug!(%url, "Realtime handle recreated");

        if self.is_logged_in() {
            self.sync_realtime().await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn allow_realtime(&self) -> bool {
        self.inner.config.read().allow_realtime
    }

    pub async fn realtime_connected(&self) -> bool {
        self.inner.realtime.lock().await.is_connected()
    }

    pub(crate) async fn enable_realtime(&self) -> Result<(), NabiiError> {
        self.inner.config.write().allow_realtime = true;
        self.inner
            .realtime
            .lock()
            .await
            .connect()
            .await
            .map_err(|err| {
                self.error(ErrorKind::Realtime {
                    reason: err.to_string(),
                })
            })
    }

    pub(crate) async fn disable_realtime(&self) {
        self.inner.config.write().allow_realtime = false;
        self.inner.realtime.lock().await.disconnect().await;
    }

    pub(crate) async fn emit(&self, event: &str, data: Value) -> Result<(), NabiiError> {
        self.inner
            .realtime
            .lock()
            .await
            .emit(event, data)
            .await
            .map_err(|err| {
                self.error(ErrorKind::Realtime {
                    reason: err.to_string(),
                })
            })
    }

    pub(crate) async fn on_realtime(&self, event: &str, handler: SocketHandler) {
        self.inner.realtime.lock().await.on(event, handler);
    }

    pub(crate) async fn off_realtime(&self, event: &str, handler: Option<&SocketHandler>) {
        self.inner.realtime.lock().await.off(event, handler);
    }

    // Push notifications

    #[must_use]
    pub fn push_token(&self) -> Option<String> {
        self.inner.config.read().push_token.clone()
    }

    #[must_use]
    pub fn allow_push(&self) -> bool {
        self.inner.config.read().allow_push
    }

    pub(crate) fn set_allow_push(&self, allow: bool) {
        self.inner.config.write().allow_push = allow;
    }

    /// The provider, as long as push notifications are enabled.
    pub(crate) fn push_provider(&self) -> Result<Arc<dyn PushProvider>, NabiiError> {
        if !self.allow_push() {
            return Err(self.error(ErrorKind::PushUnsupported));
        }
        self.inner
            .push
            .clone()
            .ok_or_else(|| self.error(ErrorKind::PushUnsupported))
    }

    async fn check_enable_push(&self) -> Result<(), NabiiError> {
        if self.allow_push() {
            self.enable_push().await
        } else {
            Ok(())
        }
    }

    pub(crate) async fn enable_push(&self) -> Result<(), NabiiError> {
        let provider = self.push_provider()?;
        let unsupported = |report: eyre::Report| {
            warn!(%report, "Push provider failed");
            self.error(ErrorKind::PushUnsupported)
        };

        let permission = provider.request_permission().await.map_err(unsupported)?;
        if permission != PushPermission::Granted {
            return Err(self.error(ErrorKind::PushNotGranted));
        }

        provider.register().await.map_err(unsupported)?;
        let token = provider.token().await.map_err(unsupported)?;

        let _user: Value = self
            .patch("/user/add-token", &json!({ "firebaseToken": token }))
            .await?;
        self.inner.config.write().push_token = Some(token);
        info!("Push notifications enabled");

        Ok(())
    }

    pub(crate) async fn disable_push(&self) -> Result<(), NabiiError> {
        let _user: Value = self.patch_empty("/user/remove-token").await?;
        self.inner.config.write().push_token = None;
        info!("Push notifications disabled");
        Ok(())
    }
}
