use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access level of a user. Serialized as its numeric value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Role {
    Banned,
    User,
    Supervisor,
    Admin,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("unknown role value: {0}")]
pub struct UnknownRole(pub u16);

impl Role {
    pub const ALL: [Self; 4] = [Self::Banned, Self::User, Self::Supervisor, Self::Admin];

    #[must_use]
    pub const fn value(self) -> u16 {
        match self {
            Self::Banned => 0,
            Self::User => 100,
            Self::Supervisor => 150,
            Self::Admin => 200,
        }
    }
}

impl TryFrom<u16> for Role {
    type Error = UnknownRole;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|role| role.value() == value)
            .ok_or(UnknownRole(value))
    }
}

impl From<Role> for u16 {
    fn from(role: Role) -> Self {
        role.value()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Banned => "BANNED",
            Self::User => "USER",
            Self::Supervisor => "SUPERVISOR",
            Self::Admin => "ADMIN",
        };
        f.write_str(name)
    }
}

/// A user as seen from the application platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    pub email: String,
    pub role: Role,
    pub firebase_token: Option<String>,
    pub last_connection: Option<String>,
    pub is_activated: bool,
}

/// A user as seen from the administrator routes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(flatten)]
    pub user: User,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCreateUserForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdatedResult {
    pub id: u64,
    pub email: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSentResult {
    pub email: String,
    pub email_success: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCreateResult {
    pub succeed: Vec<AdminUser>,
    pub failed: Vec<AdminUser>,
}
