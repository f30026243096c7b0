//! Domain errors raised by the SDK.
//!
//! Every failure surfaces as a [`NabiiError`]: a machine-readable
//! [`ErrorKind`] plus a message rendered in the session language at the
//! moment the error was raised.

use nabii_primitives::common::{Language, Platform};
use serde::Serialize;
use thiserror::Error;

use crate::events::EventKind;
use crate::messages;

/// Response received from the service for a rejected request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A setter received a value outside its allowed set.
    Configuration,
    /// The session cannot perform the call. Raised before any network I/O.
    Authorization,
    /// The request failed on the wire or was rejected by the service.
    Transport,
    /// The platform or permission state does not support the operation.
    FeatureUnavailable,
    /// A registered session event listener failed.
    Listener,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    InvalidUrl { url: String },
    InvalidLanguage { language: String },
    InvalidMode { mode: String },
    InvalidCredentials { reason: String },
    MissingLogin,
    MissingPermission { platform: Platform },
    MissingCredentials,
    Rejected { path: String, response: ErrorResponse },
    Offline { path: String, reason: String },
    InvalidResponse { path: String, reason: String },
    Realtime { reason: String },
    PushNotGranted,
    PushUnsupported,
    Listener { event: EventKind, reason: String },
}

impl ErrorKind {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidUrl { .. } | Self::InvalidLanguage { .. } | Self::InvalidMode { .. } => {
                ErrorCategory::Configuration
            }
            Self::InvalidCredentials { .. }
            | Self::MissingLogin
            | Self::MissingPermission { .. }
            | Self::MissingCredentials => ErrorCategory::Authorization,
            Self::Rejected { .. }
            | Self::Offline { .. }
            | Self::InvalidResponse { .. }
            | Self::Realtime { .. } => ErrorCategory::Transport,
            Self::PushNotGranted | Self::PushUnsupported => ErrorCategory::FeatureUnavailable,
            Self::Listener { .. } => ErrorCategory::Listener,
        }
    }
}

#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct NabiiError {
    kind: ErrorKind,
    message: String,
}

impl NabiiError {
    #[must_use]
    pub fn new(kind: ErrorKind, language: Language) -> Self {
        let message = messages::render(&kind, language);
        Self { kind, message }
    }

    #[must_use]
    pub const fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The service response, if the request reached the service at all.
    #[must_use]
    pub const fn response(&self) -> Option<&ErrorResponse> {
        match &self.kind {
            ErrorKind::Rejected { response, .. } => Some(response),
            _ => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response().map(|response| response.status)
    }

    /// True when the request never got a response from the service.
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        matches!(self.kind, ErrorKind::Offline { .. })
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
