//! Credential store abstraction.
//!
//! The core never talks to a database directly; it depends on this trait
//! and the surrounding application injects an implementation. The
//! in-memory implementation below backs the test suites and doubles as a
//! reference for the uniqueness contract real stores must enforce.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::models::{NewUser, User, UserRole};

mod memory;

pub use memory::InMemoryUserStore;

/// Abstract user repository.
///
/// Lookups return `Ok(None)` for absent records. Uniqueness violations
/// (username, email, (provider, provider id)) surface as
/// [`AuthError::Conflict`]; the store is the final arbiter under races.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, AuthError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn get_by_external_identity(
        &self,
        provider: &str,
        oauth_id: &str,
    ) -> Result<Option<User>, AuthError>;

    /// Insert a new record; the store assigns the id.
    async fn insert(&self, user: NewUser) -> Result<User, AuthError>;

    /// Persist changes to an existing record, bumping `updated_at`.
    async fn update(&self, user: &User) -> Result<User, AuthError>;

    async fn list_by_role(
        &self,
        role: UserRole,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<User>, AuthError>;
}
