pub mod auth;
pub mod authz;
pub mod email;
pub mod jwt;
pub mod oauth;
pub mod two_factor;

pub use auth::{AuthService, LoginOutcome, RegisterRequest};
pub use authz::{AuthorizationGate, RoleRequirement};
pub use email::{MockNotifier, Notifier, SmtpNotifier};
pub use jwt::{Claims, TokenKind, TokenPair, TokenService};
pub use oauth::{OauthProfile, OauthResolver};
pub use two_factor::TwoFactorService;
