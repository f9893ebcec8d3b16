use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed role enumeration. Authorization decisions compare these tags,
/// never free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Superadmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Superadmin => "superadmin",
        }
    }

    /// Admin or superadmin.
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Superadmin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A principal: one identity record.
///
/// Username and email are globally unique; a populated
/// (oauth_provider, oauth_id) pair is unique per provider. A principal
/// with `hashed_password == None` is federation-only and cannot log in
/// with a password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub hashed_password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub role: UserRole,
    pub two_factor_enabled: bool,
    pub email_verified: bool,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for the credential store; the store assigns the id
/// and creation timestamp.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub role: UserRole,
    pub two_factor_enabled: bool,
    pub email_verified: bool,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            hashed_password: None,
            first_name: None,
            last_name: None,
            avatar_url: None,
            is_active: true,
            role: UserRole::User,
            two_factor_enabled: false,
            email_verified: false,
            oauth_provider: None,
            oauth_id: None,
        }
    }
}
