//! End-to-end account lifecycle through `AuthService`, without HTTP.

mod common;

use common::{app, signer_for, token_from, OTHER_KEY_PEM, SIGNING_KEY_PEM};
use swades::auth::AuthError;
use swades::token::TokenError;

#[tokio::test]
async fn signup_verify_login_scenario() {
    let mut app = app();

    let user = app
        .auth
        .signup("alice", "alice@x.com", "pw123")
        .await
        .unwrap();
    assert!(!user.enabled);

    let users = app.store.users().await;
    assert_eq!(users.len(), 1);
    assert!(!users[0].enabled);
    assert_eq!(app.store.tokens().await.len(), 1);

    let email = app.outbox.recv().await.unwrap();
    assert_eq!(email.recipient, "alice@x.com");
    let token = token_from(&email);

    let activated = app.auth.verify_account(&token).await.unwrap();
    assert!(activated.enabled);
    assert!(app.store.users().await[0].enabled);

    let response = app.auth.login("alice", "pw123").await.unwrap();
    assert_eq!(response.username, "alice");
    assert_eq!(
        app.auth.signer().verify(&response.authentication_token).unwrap(),
        "alice"
    );

    let wrong = app.auth.login("alice", "wrongpw").await;
    assert!(matches!(wrong, Err(AuthError::Authentication)));
}

#[tokio::test]
async fn duplicate_signup_leaves_one_row() {
    let app = app();
    app.auth
        .signup("alice", "alice@x.com", "pw123")
        .await
        .unwrap();

    let second = app.auth.signup("alice", "alice2@x.com", "pw123").await;
    assert!(matches!(second, Err(AuthError::Conflict)));
    assert_eq!(app.store.users().await.len(), 1);
}

#[tokio::test]
async fn concurrent_duplicate_signups_have_one_winner() {
    let app = app();
    let first = app.auth.signup("alice", "a1@x.com", "pw123");
    let second = app.auth.signup("alice", "a2@x.com", "pw123");
    let (first, second) = tokio::join!(first, second);

    let outcomes = [first.is_ok(), second.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    assert!(matches!(
        if first.is_err() { first } else { second },
        Err(AuthError::Conflict)
    ));
    assert_eq!(app.store.users().await.len(), 1);
}

#[tokio::test]
async fn verification_token_is_single_use() {
    let mut app = app();
    app.auth
        .signup("alice", "alice@x.com", "pw123")
        .await
        .unwrap();
    let token = token_from(&app.outbox.recv().await.unwrap());

    let (first, second) = tokio::join!(
        app.auth.verify_account(&token),
        app.auth.verify_account(&token)
    );
    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);

    let third = app.auth.verify_account(&token).await;
    assert!(matches!(third, Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn never_issued_token_is_invalid() {
    let app = app();
    let result = app.auth.verify_account("bm90LWlzc3VlZA").await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn tokens_from_another_key_are_rejected() {
    let mut app = app();
    app.auth
        .signup("alice", "alice@x.com", "pw123")
        .await
        .unwrap();
    let token = token_from(&app.outbox.recv().await.unwrap());
    app.auth.verify_account(&token).await.unwrap();

    let forged = signer_for(OTHER_KEY_PEM, 900).sign("alice").unwrap();
    assert!(matches!(
        app.auth.current_user(&forged),
        Err(AuthError::InvalidToken)
    ));

    let genuine = app.auth.login("alice", "pw123").await.unwrap();
    let principal = app
        .auth
        .current_user(&genuine.authentication_token)
        .unwrap();
    assert_eq!(principal.username, "alice");
}

#[test]
fn sign_verify_roundtrip_and_tampering() {
    let signer = signer_for(SIGNING_KEY_PEM, 900);
    let token = signer.sign("alice").unwrap();
    assert_eq!(signer.verify(&token).unwrap(), "alice");

    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let payload = parts[1].clone();
    // Payload altered, signature kept.
    let forged_claims = payload.replacen(&payload[..4], "AAAA", 1);
    parts[1] = forged_claims;
    let tampered = parts.join(".");
    assert!(signer.verify(&tampered).is_err());

    let truncated = &token[..token.len() - 2];
    assert!(matches!(
        signer.verify(truncated),
        Err(TokenError::InvalidSignature | TokenError::Base64)
    ));
}
