//! Sliding-window request admission, per client identity.
//!
//! Process-local and best-effort: horizontally scaled deployments accept
//! slight inaccuracy unless they substitute a shared store.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::AuthError;

/// The admission decision for one request.
///
/// A denial is a value, not an error; it carries the configured limit
/// and window so the caller can report them.
#[derive(Debug, Clone)]
pub struct Admission {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// When a denied client can expect capacity again.
    pub reset_at: DateTime<Utc>,
    pub limit: u32,
    pub window_seconds: u64,
}

impl Admission {
    /// Convert a denial into [`AuthError::RateLimited`] for callers that
    /// propagate errors instead of inspecting the decision.
    pub fn require(&self) -> Result<(), AuthError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AuthError::RateLimited {
                limit: self.limit,
                window_seconds: self.window_seconds,
            })
        }
    }
}

/// Admits or rejects requests based on a trailing time window of
/// (timestamp, increment) entries per client identity.
///
/// The per-key entry lock makes prune-then-check-then-append atomic for
/// one client; different clients proceed in parallel.
pub struct RateAdmissionController {
    windows: DashMap<String, Vec<(DateTime<Utc>, u32)>>,
    /// Next instant a full sweep of idle client keys is due.
    next_sweep: Mutex<DateTime<Utc>>,
    limit: u32,
    window: Duration,
    window_seconds: u64,
    exempt_paths: Vec<String>,
    enabled: bool,
}

impl RateAdmissionController {
    pub fn new(config: &RateLimitConfig) -> Self {
        let window = Duration::seconds(config.window_seconds as i64);
        Self {
            windows: DashMap::new(),
            next_sweep: Mutex::new(Utc::now() + window),
            limit: config.limit,
            window,
            window_seconds: config.window_seconds,
            exempt_paths: config.exempt_paths.clone(),
            enabled: config.enabled,
        }
    }

    /// Whether a path bypasses admission entirely (health checks, docs).
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }

    /// Decide admission for one request from `client` now.
    pub fn admit(&self, client: &str) -> Admission {
        self.admit_at(client, Utc::now())
    }

    /// Clock-injected form of [`admit`](Self::admit); tests advance
    /// `now` instead of sleeping.
    pub fn admit_at(&self, client: &str, now: DateTime<Utc>) -> Admission {
        if !self.enabled {
            return Admission {
                allowed: true,
                remaining: self.limit,
                reset_at: now + self.window,
                limit: self.limit,
                window_seconds: self.window_seconds,
            };
        }

        self.sweep_if_due(now);

        let mut entries = self.windows.entry(client.to_string()).or_default();

        entries.retain(|(ts, _)| now - *ts < self.window);
        let used: u32 = entries.iter().map(|(_, count)| count).sum();

        if used >= self.limit {
            tracing::warn!(client, used, limit = self.limit, "Rate limit exceeded");
            return Admission {
                allowed: false,
                remaining: 0,
                reset_at: now + self.window,
                limit: self.limit,
                window_seconds: self.window_seconds,
            };
        }

        entries.push((now, 1));
        Admission {
            allowed: true,
            remaining: self.limit - used - 1,
            reset_at: now + self.window,
            limit: self.limit,
            window_seconds: self.window_seconds,
        }
    }

    /// Drop window state whose entries have all aged out, at most once
    /// per window. A client's own vector is pruned on its next request,
    /// but a client that stops sending never triggers that; without the
    /// sweep the map would keep one key per client ever seen.
    fn sweep_if_due(&self, now: DateTime<Utc>) {
        {
            let mut next = match self.next_sweep.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            if now < *next {
                return;
            }
            *next = now + self.window;
        }

        self.windows.retain(|_, entries| {
            entries.retain(|(ts, _)| now - *ts < self.window);
            !entries.is_empty()
        });
    }
}
