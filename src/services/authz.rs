use std::sync::Arc;

use crate::error::AuthError;
use crate::models::{User, UserRole};
use crate::services::jwt::{TokenKind, TokenService};
use crate::store::UserStore;

/// What a protected operation demands of the caller's role.
#[derive(Debug, Clone)]
pub enum RoleRequirement {
    /// Any authenticated, active principal.
    Authenticated,
    /// Exactly this role.
    Role(UserRole),
    /// Any of these roles.
    AnyOf(Vec<UserRole>),
}

impl RoleRequirement {
    /// Admin or superadmin.
    pub fn admin() -> Self {
        RoleRequirement::AnyOf(vec![UserRole::Admin, UserRole::Superadmin])
    }

    fn allows(&self, role: UserRole) -> bool {
        match self {
            RoleRequirement::Authenticated => true,
            RoleRequirement::Role(required) => role == *required,
            RoleRequirement::AnyOf(required) => required.contains(&role),
        }
    }

    fn required(&self) -> Vec<UserRole> {
        match self {
            RoleRequirement::Authenticated => Vec::new(),
            RoleRequirement::Role(required) => vec![*required],
            RoleRequirement::AnyOf(required) => required.clone(),
        }
    }
}

/// Derives the authenticated principal from a bearer token and enforces
/// role requirements. Re-evaluated on every request; nothing is cached
/// across calls.
pub struct AuthorizationGate {
    tokens: TokenService,
    store: Arc<dyn UserStore>,
}

impl AuthorizationGate {
    pub fn new(tokens: TokenService, store: Arc<dyn UserStore>) -> Self {
        Self { tokens, store }
    }

    /// Token -> principal -> active check -> role check.
    ///
    /// Any token problem (missing kind, bad signature, expiry, subject
    /// that is not a principal id) is the uniform `Unauthenticated`.
    pub async fn authorize(
        &self,
        token: &str,
        requirement: &RoleRequirement,
    ) -> Result<User, AuthError> {
        let claims = self
            .tokens
            .verify_kind(token, TokenKind::Access)
            .map_err(|_| AuthError::Unauthenticated)?;
        let user_id = claims.subject_id()?;

        let user = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        if !user.is_active {
            tracing::warn!(user_id, "Rejected token for inactive account");
            return Err(AuthError::InactiveAccount);
        }

        if !requirement.allows(user.role) {
            tracing::warn!(
                user_id,
                role = %user.role,
                "Role requirement not met"
            );
            return Err(AuthError::InsufficientPermission {
                required: requirement.required(),
            });
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_role_requirement() {
        let req = RoleRequirement::Role(UserRole::Admin);
        assert!(req.allows(UserRole::Admin));
        assert!(!req.allows(UserRole::Superadmin));
        assert!(!req.allows(UserRole::User));
    }

    #[test]
    fn any_of_requirement() {
        let req = RoleRequirement::admin();
        assert!(req.allows(UserRole::Admin));
        assert!(req.allows(UserRole::Superadmin));
        assert!(!req.allows(UserRole::User));
        assert_eq!(req.required(), vec![UserRole::Admin, UserRole::Superadmin]);
    }

    #[test]
    fn authenticated_allows_every_role() {
        let req = RoleRequirement::Authenticated;
        assert!(req.allows(UserRole::User));
        assert!(req.required().is_empty());
    }
}
