//! Nabii Client Library
//!
//! Typed client for the Nabii service. A single session tracks the access and
//! refresh tokens, attaches them to every request, refreshes them when the
//! service answers 401 and keeps the realtime channel authenticated with the
//! same token.
//!
//! ## Features
//!
//! - **Session lifecycle**: login, logout, credential restore and refresh
//! - **Retry on 401**: guarded calls refresh the session and retry once
//! - **Realtime**: WebSocket channel kept in sync with the session
//! - **Events**: `login`, `logout` and `refresh` listeners plus an error hook
//! - **Localized errors**: messages in French or English
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nabii_client::{ClientOptions, Nabii};
//!
//! # async fn run() -> Result<(), nabii_client::NabiiError> {
//! let nabii = Nabii::new(ClientOptions::default())?;
//!
//! if !nabii.v1.resolve().await {
//!     println!("Can't reach the server!");
//! }
//!
//! let credentials = nabii.v1.auth.login("john@doe.com", "password").await?;
//! println!("Welcome {}", credentials.user.first_name);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod connection;
pub mod errors;
pub mod events;
pub mod guard;
mod messages;
pub mod push;
pub mod realtime;
pub mod session;
pub mod v1;

// Re-export main types for easy access
pub use config::ClientOptions;
pub use errors::{ErrorCategory, ErrorKind, ErrorResponse, NabiiError};
pub use events::{ErrorHook, EventKind, Listener, SessionEvent};
pub use guard::Guard;
pub use push::{PushPermission, PushProvider};
pub use realtime::{
    RealtimeAuth, RealtimeConnector, RealtimeError, RealtimeTransport, SocketHandler,
    WebSocketConnector,
};
pub use session::Session;
pub use v1::{Nabii, NabiiV1, NabiiV1Builder};
// Re-export the wire types
pub use nabii_primitives as primitives;

/// Current version of the client library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
