use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::AuthError;
use crate::models::{NewUser, User, UserRole};
use crate::store::UserStore;

/// Validated identity data handed over by the OAuth transport layer
/// after the provider round-trip.
#[derive(Debug, Clone)]
pub struct OauthProfile {
    pub provider: String,
    pub provider_id: String,
    pub email: String,
    /// Desired username; uniquified if taken.
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
}

/// How many derived username suffixes to try before giving up.
const USERNAME_SUFFIX_ATTEMPTS: u32 = 8;

/// Maps an external-provider identity to a local principal, linking or
/// creating as needed. Resolution order, first match wins:
/// (provider, provider id) -> email -> create.
pub struct OauthResolver {
    store: Arc<dyn UserStore>,
}

impl OauthResolver {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Resolve a federated identity to a principal.
    ///
    /// Returns the principal and whether it was created by this call.
    /// Idempotent: the same profile always resolves to the same
    /// principal, with `created = true` at most once.
    pub async fn resolve_or_create(
        &self,
        profile: &OauthProfile,
    ) -> Result<(User, bool), AuthError> {
        if let Some(user) = self.resolve_existing(profile).await? {
            return Ok((user, false));
        }

        match self.create(profile).await {
            Ok(user) => {
                tracing::info!(
                    user_id = user.id,
                    provider = %profile.provider,
                    "Created principal from external identity"
                );
                Ok((user, true))
            }
            // Uniqueness constraint fired: someone else created the
            // account between our lookup and insert. Their record wins.
            Err(AuthError::Conflict(_)) => match self.resolve_existing(profile).await? {
                Some(user) => Ok((user, false)),
                None => Err(AuthError::Conflict(
                    "External identity resolution raced and lost".to_string(),
                )),
            },
            Err(e) => Err(e),
        }
    }

    async fn resolve_existing(&self, profile: &OauthProfile) -> Result<Option<User>, AuthError> {
        if let Some(user) = self
            .store
            .get_by_external_identity(&profile.provider, &profile.provider_id)
            .await?
        {
            return Ok(Some(user));
        }

        // Same email means same human: link the external identity onto
        // the existing account instead of duplicating it.
        if let Some(mut user) = self.store.get_by_email(&profile.email).await? {
            user.oauth_provider = Some(profile.provider.clone());
            user.oauth_id = Some(profile.provider_id.clone());
            if user.avatar_url.is_none() {
                user.avatar_url = profile.avatar_url.clone();
            }
            if !user.email_verified && profile.email_verified {
                user.email_verified = true;
            }
            let user = self.store.update(&user).await?;
            tracing::info!(
                user_id = user.id,
                provider = %profile.provider,
                "Linked external identity to existing principal"
            );
            return Ok(Some(user));
        }

        Ok(None)
    }

    async fn create(&self, profile: &OauthProfile) -> Result<User, AuthError> {
        let username = self.unique_username(profile).await?;

        let mut user = NewUser::new(username, profile.email.clone());
        user.role = UserRole::User;
        user.hashed_password = None;
        user.first_name = profile.first_name.clone();
        user.last_name = profile.last_name.clone();
        user.avatar_url = profile.avatar_url.clone();
        user.email_verified = profile.email_verified;
        user.oauth_provider = Some(profile.provider.clone());
        user.oauth_id = Some(profile.provider_id.clone());

        self.store.insert(user).await
    }

    /// Pick the desired username, or the first free candidate from a
    /// fixed suffix sequence seeded by the provider-issued id. Bounded
    /// and deterministic so collisions resolve reproducibly.
    async fn unique_username(&self, profile: &OauthProfile) -> Result<String, AuthError> {
        if self
            .store
            .get_by_username(&profile.username)
            .await?
            .is_none()
        {
            return Ok(profile.username.clone());
        }

        let seed = suffix_seed(&profile.provider_id);
        for i in 0..USERNAME_SUFFIX_ATTEMPTS {
            let candidate = format!("{}{}", profile.username, (seed + i) % 10_000);
            if self.store.get_by_username(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }

        Err(AuthError::Conflict(format!(
            "Could not derive a unique username from {}",
            profile.username
        )))
    }
}

fn suffix_seed(provider_id: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    provider_id.hash(&mut hasher);
    (hasher.finish() % 10_000) as u32
}
