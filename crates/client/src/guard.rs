//! Preconditions wrapped around resource calls.
//!
//! A [`Guard`] is checked in a fixed order: login, then platform. When
//! `refresh` is set the call is retried once after a 401, see
//! [`Session::guarded`](crate::session::Session::guarded).

use nabii_primitives::common::Platform;

use crate::errors::{ErrorKind, NabiiError};
use crate::session::Session;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Guard {
    pub login: bool,
    pub platform: Option<Platform>,
    pub refresh: bool,
}

impl Guard {
    pub const NONE: Self = Self {
        login: false,
        platform: None,
        refresh: false,
    };

    /// Logged in on the application platform, refreshed on 401.
    #[must_use]
    pub const fn application() -> Self {
        Self::NONE
            .login()
            .platform(Platform::Application)
            .refresh()
    }

    #[must_use]
    pub const fn login(mut self) -> Self {
        self.login = true;
        self
    }

    #[must_use]
    pub const fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub const fn refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    /// Runs the synchronous checks. Never touches the network.
    pub fn check(&self, session: &Session) -> Result<(), NabiiError> {
        if self.login && session.access_token().is_none() {
            return Err(session.error(ErrorKind::MissingLogin));
        }

        if let Some(platform) = self.platform {
            if session.platform() != platform {
                return Err(session.error(ErrorKind::MissingPermission { platform }));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_preset() {
        let guard = Guard::application();
        assert!(guard.login);
        assert!(guard.refresh);
        assert_eq!(guard.platform, Some(Platform::Application));
    }

    #[test]
    fn test_builder_is_additive() {
        let guard = Guard::NONE.login().refresh();
        assert!(guard.login);
        assert!(guard.refresh);
        assert_eq!(guard.platform, None);
        assert_eq!(Guard::default(), Guard::NONE);
    }
}
