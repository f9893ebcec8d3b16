//! Shared setup for the integration suites: an in-memory credential
//! store, a capturing notifier, and the core services wired together.

#![allow(dead_code)]

use std::sync::Arc;

use identity_core::config::{JwtConfig, TwoFactorConfig};
use identity_core::models::{NewUser, User, UserRole};
use identity_core::services::{
    AuthService, AuthorizationGate, MockNotifier, OauthResolver, TokenService, TwoFactorService,
};
use identity_core::store::InMemoryUserStore;
use identity_core::utils::hash_password;

pub struct TestCore {
    pub store: Arc<InMemoryUserStore>,
    pub notifier: Arc<MockNotifier>,
    pub tokens: TokenService,
    pub two_factor: Arc<TwoFactorService>,
    pub auth: AuthService,
    pub gate: AuthorizationGate,
    pub oauth: OauthResolver,
}

pub fn build_core() -> TestCore {
    dotenvy::dotenv().ok();

    let store = Arc::new(InMemoryUserStore::new());
    let notifier = Arc::new(MockNotifier::new());
    let tokens = TokenService::new(&JwtConfig {
        secret: "test-secret-do-not-use".to_string(),
        access_token_expiry_minutes: 30,
        refresh_token_expiry_days: 7,
    });
    let two_factor = Arc::new(TwoFactorService::new(&TwoFactorConfig {
        code_expiry_minutes: 10,
        code_length: 6,
    }));

    let auth = AuthService::new(
        store.clone(),
        notifier.clone(),
        tokens.clone(),
        two_factor.clone(),
        "identity-core",
    );
    let gate = AuthorizationGate::new(tokens.clone(), store.clone());
    let oauth = OauthResolver::new(store.clone());

    TestCore {
        store,
        notifier,
        tokens,
        two_factor,
        auth,
        gate,
        oauth,
    }
}

/// Insert a user with a real password hash and a verified email.
pub async fn seed_user(core: &TestCore, username: &str, email: &str, password: &str) -> User {
    use identity_core::store::UserStore;

    let mut user = NewUser::new(username, email);
    user.hashed_password = Some(hash_password(password).unwrap());
    user.email_verified = true;
    core.store.insert(user).await.unwrap()
}

/// Same, with a role.
pub async fn seed_user_with_role(
    core: &TestCore,
    username: &str,
    email: &str,
    password: &str,
    role: UserRole,
) -> User {
    use identity_core::store::UserStore;

    let mut seeded = seed_user(core, username, email, password).await;
    seeded.role = role;
    core.store.update(&seeded).await.unwrap()
}

/// Pull the one-time code out of a captured 2FA email body.
pub fn code_from_body(body: &str) -> String {
    body.lines()
        .find_map(|line| line.strip_prefix("Your two-factor authentication code is: "))
        .expect("email body should carry a 2FA code line")
        .to_string()
}
