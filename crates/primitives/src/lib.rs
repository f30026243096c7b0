//! Wire types for the Nabii service.
//!
//! Everything the backend sends or accepts is described here, independently
//! of the transport. The credential schema used to decide whether a session
//! is logged in lives in [`credentials`].

pub mod auth;
pub mod common;
pub mod credentials;
pub mod realtime;
pub mod user;
pub mod version;
