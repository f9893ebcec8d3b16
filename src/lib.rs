//! Identity and session core for a multi-tenant service.
//!
//! Authenticates users by credential or federated identity, issues and
//! verifies signed bearer tokens, layers an email one-time code over
//! password login, and enforces per-client sliding-window rate limits.
//!
//! The crate is transport-agnostic: persistence is reached through
//! [`store::UserStore`], outbound email through
//! [`services::email::Notifier`], and the embedding application binds
//! the exposed operations ([`services::AuthService`],
//! [`services::AuthorizationGate`], [`services::OauthResolver`],
//! [`rate_limit::RateAdmissionController`]) to whatever HTTP framework
//! it uses.

pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod services;
pub mod store;
pub mod utils;

pub use error::AuthError;
