use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};

use crate::config::SmtpConfig;
use crate::error::AuthError;

/// Outbound notification channel.
///
/// Fire-and-forget from the core's perspective: a failed send is
/// reported but never rolls back state that was already changed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AuthError>;
}

/// SMTP-backed [`Notifier`] over lettre.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, AuthError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        let from_email = if config.from_email.is_empty() {
            config.user.clone()
        } else {
            config.from_email.clone()
        };
        let from = if config.from_name.is_empty() {
            from_email
        } else {
            format!("{} <{}>", config.from_name, from_email)
        };

        tracing::info!(host = %config.host, "SMTP notifier initialized");

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AuthError> {
        let email = Message::builder()
            .from(self
                .from
                .parse()
                .map_err(|e: lettre::address::AddressError| AuthError::Internal(e.into()))?)
            .to(to
                .parse()
                .map_err(|e: lettre::address::AddressError| AuthError::Internal(e.into()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AuthError::Internal(e.into()))?;

        // lettre's SmtpTransport is blocking; keep it off the async runtime.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to, "Failed to send email");
                Err(AuthError::EmailError(e.to_string()))
            }
        }
    }
}

/// One captured message.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Capturing [`Notifier`] for tests; can be flipped into a failing mode
/// to exercise delivery-failure paths. Attempts are recorded either way.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("mock notifier poisoned").clone()
    }

    pub fn last(&self) -> Option<SentEmail> {
        self.sent().last().cloned()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AuthError> {
        self.sent.lock().expect("mock notifier poisoned").push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::EmailError("mock notifier failing".to_string()));
        }
        Ok(())
    }
}

/// Message templates. Plain text; transport and markup are the
/// embedder's concern.
pub mod templates {
    /// Returns (subject, body).
    pub fn two_factor_code(username: &str, code: &str, expiry_minutes: i64) -> (String, String) {
        let subject = "Your Two-Factor Authentication Code".to_string();
        let body = format!(
            "Hello {username},\n\n\
             Your two-factor authentication code is: {code}\n\n\
             This code will expire in {expiry_minutes} minutes.\n\n\
             If you didn't request this code, please secure your account immediately.",
        );
        (subject, body)
    }

    pub fn welcome(service_name: &str, username: &str) -> (String, String) {
        let subject = format!("Welcome to {service_name}");
        let body = format!(
            "Hello {username},\n\n\
             Welcome to {service_name}!\n\n\
             Your account has been successfully created. You can now log in and start using our services.\n\n\
             If you didn't create this account, please contact our support team immediately.",
        );
        (subject, body)
    }

    pub fn two_factor_enabled() -> (String, String) {
        (
            "2FA Enabled".to_string(),
            "Two-factor authentication has been enabled for your account.".to_string(),
        )
    }

    pub fn two_factor_disabled() -> (String, String) {
        (
            "2FA Disabled".to_string(),
            "Two-factor authentication has been disabled for your account. \
             If this wasn't you, please secure your account immediately."
                .to_string(),
        )
    }
}
