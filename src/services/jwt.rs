use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::AuthError;
use crate::models::{User, UserRole};

/// Which use a token is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Self-contained signed claims; tokens are not persisted anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal id, as a string)
    pub sub: String,
    pub username: String,
    pub role: UserRole,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Parse the subject back into a principal id.
    pub fn subject_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::Unauthenticated)
    }
}

/// Token pair returned to the client after a completed login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Issues and verifies signed, time-bounded bearer tokens.
///
/// The HS256 secret is process-wide state loaded once at startup; this
/// design has no mid-process rotation and no revocation list.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    /// Generate a short-lived access token for a principal.
    pub fn issue_access(&self, user: &User) -> Result<String, AuthError> {
        self.issue(
            user,
            TokenKind::Access,
            Duration::minutes(self.access_token_expiry_minutes),
        )
    }

    /// Generate a long-lived refresh token for a principal.
    pub fn issue_refresh(&self, user: &User) -> Result<String, AuthError> {
        self.issue(
            user,
            TokenKind::Refresh,
            Duration::days(self.refresh_token_expiry_days),
        )
    }

    /// Generate both tokens in the shape handed back to the caller.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access(user)?,
            refresh_token: self.issue_refresh(user)?,
            token_type: "bearer".to_string(),
            expires_in: self.access_token_expiry_minutes * 60,
        })
    }

    fn issue(&self, user: &User, kind: TokenKind, lifetime: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            kind,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))?;

        Ok(token)
    }

    /// Validate and decode a token.
    ///
    /// Malformed encoding, signature mismatch, expiry, and unsupported
    /// algorithm all collapse into the same [`AuthError::InvalidToken`];
    /// the distinction is only logged.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(reason = %e, "Token verification failed");
            AuthError::InvalidToken(Some(e))
        })?;

        Ok(data.claims)
    }

    /// Validate a token and require a specific kind.
    pub fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let claims = self.verify(token)?;
        if claims.kind != expected {
            tracing::debug!(?expected, actual = ?claims.kind, "Token kind mismatch");
            return Err(AuthError::InvalidToken(None));
        }
        Ok(claims)
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}
