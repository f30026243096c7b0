//! Session credentials and the schema they must satisfy.
//!
//! A session only counts as logged in once its credentials went through
//! [`Credentials::parse`] or [`PartialCredentials::complete`], which trim and
//! check every field the same way.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::user::User;

/// Reason a credential payload was rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("malformed credentials: {0}")]
    Malformed(String),
    #[error("field `{0}` is missing")]
    Missing(&'static str),
    #[error("field `{0}` is empty")]
    Empty(&'static str),
    #[error("field `{field}` is invalid: {value:?}")]
    Invalid { field: &'static str, value: String },
}

/// A complete, validated credential set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl Credentials {
    /// Deserializes and validates a raw payload, normalising it on the way.
    pub fn parse(value: serde_json::Value) -> Result<Self, CredentialError> {
        let credentials: Self = serde_json::from_value(value)
            .map_err(|err| CredentialError::Malformed(err.to_string()))?;
        credentials.normalized()
    }

    /// Trims textual fields and checks every constraint of the schema.
    pub fn normalized(mut self) -> Result<Self, CredentialError> {
        self.access_token = token("accessToken", &self.access_token)?;
        self.refresh_token = token("refreshToken", &self.refresh_token)?;
        self.user = validate_user(self.user)?;
        Ok(self)
    }

    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Any subset of [`Credentials`]. Used to restore a session from stored
/// tokens and to hold the transient state while a refresh completes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl PartialCredentials {
    #[must_use]
    pub fn tokens(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            user: None,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }

    /// Validates only the fields that are present.
    pub fn normalized(self) -> Result<Self, CredentialError> {
        Ok(Self {
            access_token: self
                .access_token
                .map(|value| token("accessToken", &value))
                .transpose()?,
            refresh_token: self
                .refresh_token
                .map(|value| token("refreshToken", &value))
                .transpose()?,
            user: self.user.map(validate_user).transpose()?,
        })
    }

    /// Overlays every field present in `other` onto `self`.
    pub fn overlay(&mut self, other: Self) {
        if other.access_token.is_some() {
            self.access_token = other.access_token;
        }
        if other.refresh_token.is_some() {
            self.refresh_token = other.refresh_token;
        }
        if other.user.is_some() {
            self.user = other.user;
        }
    }

    /// Turns the partial set into full credentials if every field is there
    /// and valid.
    pub fn complete(&self) -> Result<Credentials, CredentialError> {
        Credentials {
            access_token: self
                .access_token
                .clone()
                .ok_or(CredentialError::Missing("accessToken"))?,
            refresh_token: self
                .refresh_token
                .clone()
                .ok_or(CredentialError::Missing("refreshToken"))?,
            user: self.user.clone().ok_or(CredentialError::Missing("user"))?,
        }
        .normalized()
    }
}

impl From<Credentials> for PartialCredentials {
    fn from(credentials: Credentials) -> Self {
        Self {
            access_token: Some(credentials.access_token),
            refresh_token: Some(credentials.refresh_token),
            user: Some(credentials.user),
        }
    }
}

/// Body returned by `POST /auth/refresh`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResult {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl From<RefreshTokenResult> for PartialCredentials {
    fn from(result: RefreshTokenResult) -> Self {
        Self {
            access_token: Some(result.access_token),
            refresh_token: result.refresh_token,
            user: result.user,
        }
    }
}

fn token(field: &'static str, value: &str) -> Result<String, CredentialError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CredentialError::Empty(field));
    }
    Ok(value.to_owned())
}

fn validate_user(mut user: User) -> Result<User, CredentialError> {
    if Url::parse(&user.avatar).is_err() {
        return Err(CredentialError::Invalid {
            field: "user.avatar",
            value: user.avatar,
        });
    }

    user.email = user.email.trim().to_owned();
    if !is_email(&user.email) {
        return Err(CredentialError::Invalid {
            field: "user.email",
            value: user.email,
        });
    }

    if let Some(firebase_token) = user.firebase_token.take() {
        user.firebase_token = Some(firebase_token.trim().to_owned());
    }

    if let Some(last_connection) = &user.last_connection {
        // UTC only, written with a `Z` suffix.
        if !last_connection.ends_with('Z')
            || DateTime::parse_from_rfc3339(last_connection).is_err()
        {
            return Err(CredentialError::Invalid {
                field: "user.lastConnection",
                value: last_connection.clone(),
            });
        }
    }

    Ok(user)
}

/// Shape check only: one `@`, a non-empty local part and a dotted domain.
#[must_use]
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
