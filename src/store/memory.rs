use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::AuthError;
use crate::models::{NewUser, User, UserRole};
use crate::store::UserStore;

/// In-memory [`UserStore`] with the same uniqueness guarantees a real
/// database enforces through constraints. Used by the test suites and
/// usable by embedders that need no persistence.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<i64, User>>,
    next_id: AtomicI64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn check_unique(
        users: &HashMap<i64, User>,
        candidate_id: Option<i64>,
        username: &str,
        email: &str,
        external: Option<(&str, &str)>,
    ) -> Result<(), AuthError> {
        for user in users.values() {
            if Some(user.id) == candidate_id {
                continue;
            }
            if user.username == username {
                return Err(AuthError::Conflict("Username already registered".into()));
            }
            if user.email == email {
                return Err(AuthError::Conflict("Email already registered".into()));
            }
            if let (Some((provider, oauth_id)), Some(p), Some(o)) =
                (external, user.oauth_provider.as_deref(), user.oauth_id.as_deref())
            {
                if p == provider && o == oauth_id {
                    return Err(AuthError::Conflict(
                        "External identity already linked".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_by_external_identity(
        &self,
        provider: &str,
        oauth_id: &str,
    ) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| {
                u.oauth_provider.as_deref() == Some(provider)
                    && u.oauth_id.as_deref() == Some(oauth_id)
            })
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        Self::check_unique(
            &users,
            None,
            &user.username,
            &user.email,
            match (user.oauth_provider.as_deref(), user.oauth_id.as_deref()) {
                (Some(p), Some(o)) => Some((p, o)),
                _ => None,
            },
        )?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = User {
            id,
            username: user.username,
            email: user.email,
            hashed_password: user.hashed_password,
            first_name: user.first_name,
            last_name: user.last_name,
            avatar_url: user.avatar_url,
            is_active: user.is_active,
            role: user.role,
            two_factor_enabled: user.two_factor_enabled,
            email_verified: user.email_verified,
            oauth_provider: user.oauth_provider,
            oauth_id: user.oauth_id,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        users.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, user: &User) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(AuthError::NotFound(format!("user {}", user.id)));
        }
        Self::check_unique(
            &users,
            Some(user.id),
            &user.username,
            &user.email,
            match (user.oauth_provider.as_deref(), user.oauth_id.as_deref()) {
                (Some(p), Some(o)) => Some((p, o)),
                _ => None,
            },
        )?;

        let mut record = user.clone();
        record.updated_at = Some(Utc::now());
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_by_role(
        &self,
        role: UserRole,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<User>, AuthError> {
        let users = self.users.read().await;
        let mut matching: Vec<User> = users.values().filter(|u| u.role == role).cloned().collect();
        matching.sort_by_key(|u| u.id);
        Ok(matching.into_iter().skip(skip).take(limit).collect())
    }
}
