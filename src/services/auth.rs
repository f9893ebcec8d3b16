use std::sync::Arc;

use chrono::Utc;

use crate::error::AuthError;
use crate::models::{NewUser, User, UserRole};
use crate::services::email::{templates, Notifier};
use crate::services::jwt::{TokenPair, TokenService};
use crate::services::two_factor::TwoFactorService;
use crate::store::UserStore;
use crate::utils::password::{hash_password, verify_password};

/// What a login attempt produced.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Credentials were sufficient; here are the tokens.
    Tokens(TokenPair),
    /// Credentials checked out but a one-time code was emailed and must
    /// be presented to [`AuthService::verify_two_factor`].
    TwoFactorRequired { user_id: i64 },
}

/// Registration payload.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
}

impl RegisterRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
            role: UserRole::User,
        }
    }
}

/// Login and account-security orchestration over the injected
/// collaborators. Holds no request state of its own.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    notifier: Arc<dyn Notifier>,
    tokens: TokenService,
    two_factor: Arc<TwoFactorService>,
    service_name: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
        tokens: TokenService,
        two_factor: Arc<TwoFactorService>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            tokens,
            two_factor,
            service_name: service_name.into(),
        }
    }

    /// Register a new user with a hashed password.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AuthError> {
        if self
            .store
            .get_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict("Username already registered".into()));
        }
        if self.store.get_by_email(&request.email).await?.is_some() {
            return Err(AuthError::Conflict("Email already registered".into()));
        }

        let mut user = NewUser::new(request.username, request.email);
        user.hashed_password = Some(hash_password(&request.password)?);
        user.first_name = request.first_name;
        user.last_name = request.last_name;
        user.role = request.role;

        let user = self.store.insert(user).await?;
        tracing::info!(user_id = user.id, "User registered");

        let (subject, body) = templates::welcome(&self.service_name, &user.username);
        if let Err(e) = self.notifier.send(&user.email, &subject, &body).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to send welcome email");
        }

        Ok(user)
    }

    /// Authenticate by username or email plus password.
    ///
    /// Either factor failing, or the account being federation-only,
    /// yields the same `InvalidCredentials`.
    async fn authenticate(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let user = match self.store.get_by_username(identifier).await? {
            Some(user) => Some(user),
            None => self.store.get_by_email(identifier).await?,
        };

        let user = user.ok_or(AuthError::InvalidCredentials)?;
        let hash = user
            .hashed_password
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, hash) {
            tracing::warn!(user_id = user.id, "Password verification failed");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Log in with a credential pair.
    ///
    /// When the account has 2FA enabled this emails a one-time code and
    /// returns [`LoginOutcome::TwoFactorRequired`]; a delivery failure
    /// is logged but the challenge stays valid.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let user = self.authenticate(identifier, password).await?;

        if !user.is_active {
            return Err(AuthError::InactiveAccount);
        }

        if user.two_factor_enabled {
            let code = self.two_factor.generate(user.id);
            let (subject, body) = templates::two_factor_code(
                &user.username,
                &code,
                self.two_factor.code_expiry_minutes(),
            );
            if let Err(e) = self.notifier.send(&user.email, &subject, &body).await {
                tracing::warn!(user_id = user.id, error = %e, "Failed to send 2FA code email");
            }
            return Ok(LoginOutcome::TwoFactorRequired { user_id: user.id });
        }

        let user = self.touch_last_login(user).await?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok(LoginOutcome::Tokens(self.tokens.issue_pair(&user)?))
    }

    /// Complete a 2FA login with the emailed code.
    pub async fn verify_two_factor(
        &self,
        user_id: i64,
        code: &str,
    ) -> Result<TokenPair, AuthError> {
        if !self.two_factor.verify(user_id, code) {
            return Err(AuthError::InvalidCode);
        }

        let user = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        let user = self.touch_last_login(user).await?;
        tracing::info!(user_id = user.id, "User logged in with 2FA");
        self.tokens.issue_pair(&user)
    }

    /// Turn on 2FA; requires a verified email address first.
    pub async fn enable_two_factor(&self, user_id: i64) -> Result<User, AuthError> {
        let mut user = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        if user.two_factor_enabled {
            return Err(AuthError::AlreadyEnabled);
        }
        if !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        user.two_factor_enabled = true;
        let user = self.store.update(&user).await?;
        tracing::info!(user_id = user.id, "2FA enabled");

        let (subject, body) = templates::two_factor_enabled();
        if let Err(e) = self.notifier.send(&user.email, &subject, &body).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to send 2FA confirmation email");
        }

        Ok(user)
    }

    /// Turn off 2FA; requires password re-confirmation.
    pub async fn disable_two_factor(
        &self,
        user_id: i64,
        password: &str,
    ) -> Result<User, AuthError> {
        let mut user = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        if !user.two_factor_enabled {
            return Err(AuthError::NotEnabled);
        }

        let verified = user
            .hashed_password
            .as_deref()
            .map(|hash| verify_password(password, hash))
            .unwrap_or(false);
        if !verified {
            return Err(AuthError::WrongPassword);
        }

        user.two_factor_enabled = false;
        let user = self.store.update(&user).await?;
        tracing::info!(user_id = user.id, "2FA disabled");

        let (subject, body) = templates::two_factor_disabled();
        if let Err(e) = self.notifier.send(&user.email, &subject, &body).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to send 2FA notification email");
        }

        Ok(user)
    }

    /// Send a test one-time code to the user's email.
    ///
    /// Unlike login, delivery failure is surfaced here: delivery is the
    /// whole point of the call.
    pub async fn send_test_code(&self, user_id: i64) -> Result<(), AuthError> {
        let user = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        let code = self.two_factor.generate(user.id);
        let (subject, body) = templates::two_factor_code(
            &user.username,
            &code,
            self.two_factor.code_expiry_minutes(),
        );
        self.notifier.send(&user.email, &subject, &body).await
    }

    /// Change a user's role; superadmin only.
    pub async fn change_role(
        &self,
        requester: &User,
        user_id: i64,
        new_role: UserRole,
    ) -> Result<User, AuthError> {
        if requester.role != UserRole::Superadmin {
            return Err(AuthError::InsufficientPermission {
                required: vec![UserRole::Superadmin],
            });
        }

        let mut user = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        user.role = new_role;
        let user = self.store.update(&user).await?;
        tracing::info!(user_id = user.id, role = %user.role, "User role changed");
        Ok(user)
    }

    async fn touch_last_login(&self, mut user: User) -> Result<User, AuthError> {
        user.last_login_at = Some(Utc::now());
        self.store.update(&user).await
    }
}
