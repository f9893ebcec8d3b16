//! Process configuration.
//!
//! Loaded once from the environment at startup and passed into
//! constructors; nothing in the core reads the environment afterwards,
//! so tests can build isolated config structs directly.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::AuthError;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub service_name: String,
    pub log_level: String,
    pub jwt: JwtConfig,
    pub two_factor: TwoFactorConfig,
    pub smtp: SmtpConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Process-wide HS256 signing secret.
    pub secret: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone)]
pub struct TwoFactorConfig {
    pub code_expiry_minutes: i64,
    pub code_length: usize,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub limit: u32,
    pub window_seconds: u64,
    pub exempt_paths: Vec<String>,
}

impl CoreConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        let service_name = get_env("SERVICE_NAME", Some("identity-core"))?;

        Ok(CoreConfig {
            log_level: get_env("LOG_LEVEL", Some("info"))?,
            jwt: JwtConfig {
                secret: get_env(
                    "JWT_SECRET",
                    Some("your-secret-key-here-change-in-production"),
                )?,
                access_token_expiry_minutes: parse_env("ACCESS_TOKEN_EXPIRE_MINUTES", "30")?,
                refresh_token_expiry_days: parse_env("REFRESH_TOKEN_EXPIRE_DAYS", "7")?,
            },
            two_factor: TwoFactorConfig {
                code_expiry_minutes: parse_env("TWO_FA_CODE_EXPIRE_MINUTES", "10")?,
                code_length: parse_env("TWO_FA_CODE_LENGTH", "6")?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"))?,
                port: parse_env("SMTP_PORT", "587")?,
                user: get_env("SMTP_USER", Some(""))?,
                password: get_env("SMTP_PASSWORD", Some(""))?,
                from_email: get_env("EMAILS_FROM_EMAIL", Some(""))?,
                from_name: get_env("EMAILS_FROM_NAME", Some(&service_name))?,
            },
            rate_limit: RateLimitConfig {
                enabled: parse_env("RATE_LIMIT_ENABLED", "true")?,
                limit: parse_env("RATE_LIMIT_PER_MINUTE", "60")?,
                window_seconds: parse_env("RATE_LIMIT_WINDOW_SECONDS", "60")?,
                exempt_paths: get_env(
                    "RATE_LIMIT_EXEMPT_PATHS",
                    Some("/,/api/v1/health,/api/docs,/api/redoc"),
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
            service_name,
        })
    }
}

fn get_env(name: &str, default: Option<&str>) -> Result<String, AuthError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => match default {
            Some(value) => Ok(value.to_string()),
            None => Err(AuthError::ConfigError(anyhow::anyhow!(
                "Missing required environment variable {name}"
            ))),
        },
    }
}

fn parse_env<T>(name: &str, default: &str) -> Result<T, AuthError>
where
    T: FromStr,
    T::Err: Display,
{
    get_env(name, Some(default))?.parse().map_err(|e: T::Err| {
        AuthError::ConfigError(anyhow::anyhow!("Invalid value for {name}: {e}"))
    })
}
