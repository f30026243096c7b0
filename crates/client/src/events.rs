//! Session lifecycle events and the global error hook.

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use nabii_primitives::credentials::Credentials;

use crate::errors::NabiiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Login,
    Logout,
    Refresh,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Refresh => "refresh",
        })
    }
}

/// Payload handed to listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Login(Credentials),
    Logout,
    Refresh(Credentials),
}

impl SessionEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Login(_) => EventKind::Login,
            Self::Logout => EventKind::Logout,
            Self::Refresh(_) => EventKind::Refresh,
        }
    }

    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::Login(credentials) | Self::Refresh(credentials) => Some(credentials),
            Self::Logout => None,
        }
    }
}

type ListenerFn = dyn Fn(SessionEvent) -> BoxFuture<'static, eyre::Result<()>> + Send + Sync;

/// A registered callback. Clones share identity, which is what
/// [`EventListeners::remove`] compares.
#[derive(Clone)]
pub struct Listener(Arc<ListenerFn>);

impl Listener {
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(SessionEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        Self(Arc::new(move |event| Box::pin(callback(event))))
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn call(&self, event: SessionEvent) -> BoxFuture<'static, eyre::Result<()>> {
        (self.0)(event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Ordered listener lists, one per event kind. Registration order is
/// invocation order and duplicates are kept.
#[derive(Clone, Debug, Default)]
pub struct EventListeners {
    login: Vec<Listener>,
    logout: Vec<Listener>,
    refresh: Vec<Listener>,
}

impl EventListeners {
    const fn slot(&self, kind: EventKind) -> &Vec<Listener> {
        match kind {
            EventKind::Login => &self.login,
            EventKind::Logout => &self.logout,
            EventKind::Refresh => &self.refresh,
        }
    }

    fn slot_mut(&mut self, kind: EventKind) -> &mut Vec<Listener> {
        match kind {
            EventKind::Login => &mut self.login,
            EventKind::Logout => &mut self.logout,
            EventKind::Refresh => &mut self.refresh,
        }
    }

    pub fn add(&mut self, kind: EventKind, listener: Listener) {
        self.slot_mut(kind).push(listener);
    }

    /// Removes the first registration of `listener`. Returns whether one was
    /// found.
    pub fn remove(&mut self, kind: EventKind, listener: &Listener) -> bool {
        let slot = self.slot_mut(kind);
        let Some(index) = slot.iter().position(|candidate| candidate.ptr_eq(listener)) else {
            return false;
        };
        let _removed = slot.remove(index);
        true
    }

    #[must_use]
    pub fn list(&self, kind: EventKind) -> Vec<Listener> {
        self.slot(kind).clone()
    }
}

type HookFn = dyn Fn(NabiiError) -> BoxFuture<'static, eyre::Result<()>> + Send + Sync;

/// Single-slot callback observing every rejected request.
#[derive(Clone)]
pub struct ErrorHook(Arc<HookFn>);

impl ErrorHook {
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(NabiiError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        Self(Arc::new(move |err| Box::pin(callback(err))))
    }

    pub(crate) fn call(&self, err: NabiiError) -> BoxFuture<'static, eyre::Result<()>> {
        (self.0)(err)
    }
}

impl fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHook")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        Listener::new(|_| async { Ok(()) })
    }

    #[test]
    fn test_add_then_remove_leaves_nothing() {
        let mut listeners = EventListeners::default();
        let on_login = noop();

        listeners.add(EventKind::Login, on_login.clone());
        assert_eq!(listeners.list(EventKind::Login).len(), 1);

        assert!(listeners.remove(EventKind::Login, &on_login));
        assert!(listeners.list(EventKind::Login).is_empty());
    }

    #[test]
    fn test_duplicates_are_kept_and_removed_one_at_a_time() {
        let mut listeners = EventListeners::default();
        let on_refresh = noop();

        listeners.add(EventKind::Refresh, on_refresh.clone());
        listeners.add(EventKind::Refresh, on_refresh.clone());
        assert_eq!(listeners.list(EventKind::Refresh).len(), 2);

        assert!(listeners.remove(EventKind::Refresh, &on_refresh));
        assert_eq!(listeners.list(EventKind::Refresh).len(), 1);
    }

    #[test]
    fn test_remove_unknown_listener_is_a_no_op() {
        let mut listeners = EventListeners::default();
        let registered = noop();
        listeners.add(EventKind::Logout, registered.clone());

        assert!(!listeners.remove(EventKind::Logout, &noop()));
        assert!(!listeners.remove(EventKind::Login, &registered));
        assert_eq!(listeners.list(EventKind::Logout).len(), 1);
    }

    #[test]
    fn test_order_is_registration_order() {
        let mut listeners = EventListeners::default();
        let first = noop();
        let second = noop();
        listeners.add(EventKind::Login, first.clone());
        listeners.add(EventKind::Login, second.clone());

        let listed = listeners.list(EventKind::Login);
        assert!(listed[0].ptr_eq(&first));
        assert!(listed[1].ptr_eq(&second));
    }
}
