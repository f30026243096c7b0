//! Session configuration and the options a client is built from.

use nabii_primitives::common::{Language, Mode, Platform};
use nabii_primitives::credentials::{Credentials, PartialCredentials};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_URL: &str = "http://localhost:1338";

/// Path pinged by `resolve()`. Failures on it never reach the error hook.
pub const LIVENESS_PATH: &str = "/ping";

/// Options used to build a client. Every field has a default, so an empty
/// TOML or JSON document is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default)]
    pub language: Language,

    #[serde(default)]
    pub mode: Mode,

    /// Connect the realtime channel as soon as the session is authenticated.
    #[serde(default = "default_true")]
    pub allow_realtime: bool,

    /// Register for push notifications on login.
    #[serde(default)]
    pub allow_push: bool,

    /// Path of the realtime endpoint, relative to `url`.
    #[serde(default = "default_realtime_path")]
    pub realtime_path: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: default_url(),
            language: Language::default(),
            mode: Mode::default(),
            allow_realtime: default_true(),
            allow_push: false,
            realtime_path: default_realtime_path(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.to_owned()
}

const fn default_true() -> bool {
    true
}

fn default_realtime_path() -> String {
    "/socket".to_owned()
}

/// In-memory state of one session. Owned by the session and only written
/// through its methods.
#[derive(Clone, Debug)]
pub(crate) struct SessionConfig {
    pub url: String,
    pub language: Language,
    pub mode: Mode,
    pub platform: Platform,
    pub credentials: PartialCredentials,
    pub is_logged_in: bool,
    pub allow_realtime: bool,
    pub allow_push: bool,
    pub push_token: Option<String>,
}

impl SessionConfig {
    pub fn new(url: String, options: &ClientOptions) -> Self {
        Self {
            url,
            language: options.language,
            mode: options.mode,
            platform: Platform::Application,
            credentials: PartialCredentials::default(),
            is_logged_in: false,
            allow_realtime: options.allow_realtime,
            allow_push: options.allow_push,
            push_token: None,
        }
    }

    /// Credentials as exposed to callers: only complete, validated sets.
    pub fn credentials(&self) -> Option<Credentials> {
        if !self.is_logged_in {
            return None;
        }
        self.credentials.complete().ok()
    }

    pub fn clear_credentials(&mut self) {
        self.credentials = PartialCredentials::default();
        self.is_logged_in = false;
    }
}

/// Normalises a base URL: backslashes become slashes and trailing slashes
/// are dropped. The result must parse as an absolute, hierarchical URL.
pub(crate) fn normalize_url(url: &str) -> Option<String> {
    let normalized = url.replace('\\', "/");
    let normalized = normalized.trim_end_matches('/');

    let parsed = Url::parse(normalized).ok()?;
    if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
        return None;
    }

    Some(normalized.to_owned())
}
