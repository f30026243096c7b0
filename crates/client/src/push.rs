//! Push notification provider seam.
//!
//! The SDK never talks to a push service itself. The embedding application
//! hands in a [`PushProvider`] wrapping whatever the device offers; without
//! one every push operation fails as unsupported.

use core::fmt;

use async_trait::async_trait;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushPermission {
    Granted,
    Denied,
    /// The user has not answered yet.
    Prompt,
}

#[async_trait]
pub trait PushProvider: Send + Sync + fmt::Debug {
    async fn request_permission(&self) -> eyre::Result<PushPermission>;

    async fn register(&self) -> eyre::Result<()>;

    /// Device token issued once registered.
    async fn token(&self) -> eyre::Result<String>;

    async fn remove_all_listeners(&self) -> eyre::Result<()>;
}
