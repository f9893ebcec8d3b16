use thiserror::Error;

use crate::models::UserRole;

/// Crate-wide error type.
///
/// Every variant is a recoverable, caller-reportable outcome; nothing in
/// the core panics on bad input. Authentication failures are deliberately
/// uniform so an unauthenticated caller cannot tell which factor was wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect username/email or password")]
    InvalidCredentials,

    #[error("Inactive user")]
    InactiveAccount,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] Option<jsonwebtoken::errors::Error>),

    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error("User not found")]
    PrincipalNotFound,

    #[error("Insufficient permissions. One of these roles required: {}", join_roles(.required))]
    InsufficientPermission { required: Vec<UserRole> },

    #[error("Invalid or expired 2FA code")]
    InvalidCode,

    #[error("2FA is already enabled")]
    AlreadyEnabled,

    #[error("2FA is not enabled")]
    NotEnabled,

    #[error("Please verify your email before enabling 2FA")]
    EmailNotVerified,

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Please try again later (limit {limit} per {window_seconds}s)")]
    RateLimited { limit: u32, window_seconds: u64 },

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn join_roles(roles: &[UserRole]) -> String {
    roles
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_permission_names_required_roles() {
        let err = AuthError::InsufficientPermission {
            required: vec![UserRole::Admin, UserRole::Superadmin],
        };
        assert_eq!(
            err.to_string(),
            "Insufficient permissions. One of these roles required: admin, superadmin"
        );
    }

    #[test]
    fn credential_failures_share_one_message() {
        // Unknown user and wrong password must be indistinguishable.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Incorrect username/email or password"
        );
    }
}
