mod common;

use common::{build_core, code_from_body, seed_user};
use identity_core::error::AuthError;
use identity_core::services::{LoginOutcome, TokenKind};
use identity_core::store::UserStore;

async fn seed_2fa_user(core: &common::TestCore) -> identity_core::models::User {
    let mut user = seed_user(core, "alice", "alice@example.com", "hunter2!").await;
    user.two_factor_enabled = true;
    core.store.update(&user).await.unwrap()
}

#[tokio::test]
async fn two_factor_login_flow() {
    let core = build_core();
    let user = seed_2fa_user(&core).await;

    let outcome = core.auth.login("alice", "hunter2!").await.unwrap();
    let user_id = match outcome {
        LoginOutcome::TwoFactorRequired { user_id } => user_id,
        other => panic!("expected a 2FA challenge, got {other:?}"),
    };
    assert_eq!(user_id, user.id);

    // No tokens yet; the code went out by email.
    let email = core.notifier.last().expect("2FA email should be sent");
    assert_eq!(email.to, "alice@example.com");
    let code = code_from_body(&email.body);

    let pair = core.auth.verify_two_factor(user_id, &code).await.unwrap();
    let claims = core
        .tokens
        .verify_kind(&pair.access_token, TokenKind::Access)
        .unwrap();
    assert_eq!(claims.subject_id().unwrap(), user.id);

    let stored = core.store.get_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.last_login_at.is_some());
}

#[tokio::test]
async fn code_is_single_use() {
    let core = build_core();
    let user = seed_2fa_user(&core).await;

    core.auth.login("alice", "hunter2!").await.unwrap();
    let code = code_from_body(&core.notifier.last().unwrap().body);

    core.auth.verify_two_factor(user.id, &code).await.unwrap();
    let err = core.auth.verify_two_factor(user.id, &code).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
}

#[tokio::test]
async fn wrong_code_fails_without_consuming_the_challenge() {
    let core = build_core();
    let user = seed_2fa_user(&core).await;

    core.auth.login("alice", "hunter2!").await.unwrap();
    let code = code_from_body(&core.notifier.last().unwrap().body);
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let err = core.auth.verify_two_factor(user.id, wrong).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));

    // The real code still works afterwards.
    assert!(core.auth.verify_two_factor(user.id, &code).await.is_ok());
}

#[tokio::test]
async fn verify_without_challenge_fails() {
    let core = build_core();
    let user = seed_2fa_user(&core).await;

    let err = core.auth.verify_two_factor(user.id, "123456").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
}

#[tokio::test]
async fn delivery_failure_keeps_the_challenge_valid() {
    let core = build_core();
    let user = seed_2fa_user(&core).await;
    core.notifier.set_failing(true);

    // Login still reports that 2FA is required.
    let outcome = core.auth.login("alice", "hunter2!").await.unwrap();
    assert!(matches!(outcome, LoginOutcome::TwoFactorRequired { .. }));

    // The generated code (captured from the failed attempt) verifies.
    let code = code_from_body(&core.notifier.last().unwrap().body);
    assert!(core.auth.verify_two_factor(user.id, &code).await.is_ok());
}

#[tokio::test]
async fn enable_requires_verified_email() {
    let core = build_core();
    let mut user = seed_user(&core, "alice", "alice@example.com", "hunter2!").await;
    user.email_verified = false;
    let user = core.store.update(&user).await.unwrap();

    let err = core.auth.enable_two_factor(user.id).await.unwrap_err();
    assert!(matches!(err, AuthError::EmailNotVerified));
}

#[tokio::test]
async fn enable_then_enable_again_conflicts() {
    let core = build_core();
    let user = seed_user(&core, "alice", "alice@example.com", "hunter2!").await;

    let enabled = core.auth.enable_two_factor(user.id).await.unwrap();
    assert!(enabled.two_factor_enabled);
    assert_eq!(core.notifier.last().unwrap().subject, "2FA Enabled");

    let err = core.auth.enable_two_factor(user.id).await.unwrap_err();
    assert!(matches!(err, AuthError::AlreadyEnabled));
}

#[tokio::test]
async fn disable_requires_password_confirmation() {
    let core = build_core();
    let user = seed_2fa_user(&core).await;

    let err = core
        .auth
        .disable_two_factor(user.id, "not-the-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WrongPassword));

    let disabled = core.auth.disable_two_factor(user.id, "hunter2!").await.unwrap();
    assert!(!disabled.two_factor_enabled);
    assert_eq!(core.notifier.last().unwrap().subject, "2FA Disabled");
}

#[tokio::test]
async fn disable_when_not_enabled_conflicts() {
    let core = build_core();
    let user = seed_user(&core, "alice", "alice@example.com", "hunter2!").await;

    let err = core.auth.disable_two_factor(user.id, "hunter2!").await.unwrap_err();
    assert!(matches!(err, AuthError::NotEnabled));
}

#[tokio::test]
async fn test_code_is_sent_and_verifiable() {
    let core = build_core();
    let user = seed_user(&core, "alice", "alice@example.com", "hunter2!").await;

    core.auth.send_test_code(user.id).await.unwrap();
    let code = code_from_body(&core.notifier.last().unwrap().body);
    assert!(core.auth.verify_two_factor(user.id, &code).await.is_ok());
}

#[tokio::test]
async fn test_code_surfaces_delivery_failure() {
    let core = build_core();
    let user = seed_user(&core, "alice", "alice@example.com", "hunter2!").await;
    core.notifier.set_failing(true);

    let err = core.auth.send_test_code(user.id).await.unwrap_err();
    assert!(matches!(err, AuthError::EmailError(_)));
}
