use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::config::TwoFactorConfig;

/// Pending one-time code for one principal.
#[derive(Debug, Clone)]
struct Challenge {
    code: String,
    expires_at: DateTime<Utc>,
}

/// Generates, stores, and verifies short-lived one-time codes.
///
/// At most one pending challenge per principal; generating a new one
/// supersedes the prior. Delivery of the code is the notifier's job.
/// The map is shared across concurrent requests; entry access keeps the
/// generate/verify read-modify-write atomic per principal.
pub struct TwoFactorService {
    challenges: DashMap<i64, Challenge>,
    code_expiry_minutes: i64,
    code_length: usize,
}

impl TwoFactorService {
    pub fn new(config: &TwoFactorConfig) -> Self {
        Self {
            challenges: DashMap::new(),
            code_expiry_minutes: config.code_expiry_minutes,
            code_length: config.code_length,
        }
    }

    /// Create a fresh numeric code for a principal, replacing any
    /// pending one, and return it for delivery.
    pub fn generate(&self, user_id: i64) -> String {
        let mut rng = rand::thread_rng();
        let code: String = (0..self.code_length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10)))
            .collect();

        self.challenges.insert(
            user_id,
            Challenge {
                code: code.clone(),
                expires_at: Utc::now() + Duration::minutes(self.code_expiry_minutes),
            },
        );

        tracing::info!(user_id, "2FA code generated");
        code
    }

    /// Check a code for a principal; on success the challenge is
    /// consumed and the same code can never verify again.
    pub fn verify(&self, user_id: i64, code: &str) -> bool {
        let entry = match self.challenges.entry(user_id) {
            Entry::Occupied(entry) => entry,
            Entry::Vacant(_) => {
                tracing::warn!(user_id, "2FA verification with no pending challenge");
                return false;
            }
        };

        let challenge = entry.get();
        if Utc::now() >= challenge.expires_at {
            entry.remove();
            tracing::warn!(user_id, "2FA code expired");
            return false;
        }

        let matches: bool = challenge
            .code
            .as_bytes()
            .ct_eq(code.as_bytes())
            .into();
        if matches {
            entry.remove();
            tracing::info!(user_id, "2FA code verified");
            true
        } else {
            tracing::warn!(user_id, "Invalid 2FA code attempt");
            false
        }
    }

    pub fn code_expiry_minutes(&self) -> i64 {
        self.code_expiry_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(expiry_minutes: i64) -> TwoFactorService {
        TwoFactorService::new(&TwoFactorConfig {
            code_expiry_minutes: expiry_minutes,
            code_length: 6,
        })
    }

    #[test]
    fn generated_code_is_fixed_length_numeric() {
        let svc = service(10);
        let code = svc.generate(1);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn correct_code_verifies_exactly_once() {
        let svc = service(10);
        let code = svc.generate(1);
        assert!(svc.verify(1, &code));
        // Consumed on first success.
        assert!(!svc.verify(1, &code));
    }

    #[test]
    fn wrong_code_fails() {
        let svc = service(10);
        let code = svc.generate(1);
        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(!svc.verify(1, wrong));
    }

    #[test]
    fn missing_challenge_fails() {
        let svc = service(10);
        assert!(!svc.verify(99, "123456"));
    }

    #[test]
    fn expired_code_fails_and_is_removed() {
        let svc = service(0);
        let code = svc.generate(1);
        assert!(!svc.verify(1, &code));
        // Entry pruned on the failed attempt.
        assert!(svc.challenges.get(&1).is_none());
    }

    #[test]
    fn new_challenge_supersedes_previous() {
        let svc = service(10);
        let old = svc.generate(1);
        let new = svc.generate(1);
        if old != new {
            assert!(!svc.verify(1, &old));
        }
        assert!(svc.verify(1, &new));
    }

    #[test]
    fn challenges_are_keyed_per_principal() {
        let svc = service(10);
        let a = svc.generate(1);
        let b = svc.generate(2);
        assert!(svc.verify(2, &b));
        assert!(svc.verify(1, &a));
    }
}
