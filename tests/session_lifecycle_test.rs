//! Session lifecycle: login, verification, lazy expiry, logout and the
//! capability predicates.

mod common;

use std::time::Duration;

use anteroom::auth::models::{ParticipantRole, SubjectRef};
use anteroom::config::AuthConfig;
use anteroom::domain::{SessionId, UserId};
use anteroom::AnteroomError;
use chrono::Utc;

use common::{seed_company, seed_room, seed_user, setup, setup_with_auth_config};

#[tokio::test]
async fn company_login_issues_session_with_ttl() {
    let ctx = setup().await;
    seed_company(&ctx.services, "Acme", "secret123").await;

    let before = Utc::now();
    let session = ctx
        .services
        .auth
        .login_as_company("Acme", "secret123")
        .await
        .unwrap();
    let after = Utc::now();

    assert!(session.subject.is_company());
    assert_eq!(session.token.len(), 86);
    // expiresAt ~ now + 1800s
    assert!(session.expires_at >= before + chrono::Duration::seconds(1800));
    assert!(session.expires_at <= after + chrono::Duration::seconds(1800));
}

#[tokio::test]
async fn company_login_with_wrong_password_is_unauthorized() {
    let ctx = setup().await;
    seed_company(&ctx.services, "Acme", "secret123").await;

    let result = ctx.services.auth.login_as_company("Acme", "wrong").await;
    assert!(matches!(result, Err(AnteroomError::Auth { .. })));
}

#[tokio::test]
async fn login_of_unknown_company_is_not_found() {
    let ctx = setup().await;

    let result = ctx
        .services
        .auth
        .login_as_company("Ghost", "secret123")
        .await;
    assert!(matches!(result, Err(AnteroomError::NotFound { .. })));
}

#[tokio::test]
async fn user_login_and_token_verification() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;

    let session = ctx
        .services
        .auth
        .login_as_user("jan@example.com", "hunter22x")
        .await
        .unwrap();

    assert!(session.subject.is_user());
    // Correct token verifies, any other string does not
    assert!(ctx
        .services
        .auth
        .verify_token(session.id, &session.token)
        .unwrap());
    assert!(!ctx
        .services
        .auth
        .verify_token(session.id, "some-other-token")
        .unwrap());
}

#[tokio::test]
async fn multiple_concurrent_sessions_per_subject_are_permitted() {
    let ctx = setup().await;
    seed_company(&ctx.services, "Acme", "secret123").await;

    let first = ctx
        .services
        .auth
        .login_as_company("Acme", "secret123")
        .await
        .unwrap();
    let second = ctx
        .services
        .auth
        .login_as_company("Acme", "secret123")
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert!(ctx.services.auth.verify_token(first.id, &first.token).unwrap());
    assert!(ctx
        .services
        .auth
        .verify_token(second.id, &second.token)
        .unwrap());
}

#[tokio::test]
async fn expired_session_is_evicted_on_access() {
    let ctx = setup_with_auth_config(AuthConfig {
        session_ttl_seconds: 0,
        ..Default::default()
    })
    .await;
    seed_company(&ctx.services, "Acme", "secret123").await;

    let session = ctx
        .services
        .auth
        .login_as_company("Acme", "secret123")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // verify_token removes the stale record and reports the session as absent
    let result = ctx.services.auth.verify_token(session.id, &session.token);
    assert!(matches!(result, Err(AnteroomError::NotFound { .. })));

    // ... so a later eviction attempt cannot find it either
    let result = ctx.services.auth.evict_if_expired(session.id);
    assert!(matches!(result, Err(AnteroomError::NotFound { .. })));
    assert!(ctx.services.sessions.is_empty());
}

#[tokio::test]
async fn evict_if_expired_leaves_live_sessions_alone() {
    let ctx = setup().await;
    seed_company(&ctx.services, "Acme", "secret123").await;

    let session = ctx
        .services
        .auth
        .login_as_company("Acme", "secret123")
        .await
        .unwrap();

    assert!(!ctx.services.auth.evict_if_expired(session.id).unwrap());
    assert!(ctx
        .services
        .auth
        .verify_token(session.id, &session.token)
        .unwrap());
}

#[tokio::test]
async fn logout_removes_session_and_second_logout_fails() {
    let ctx = setup().await;
    seed_company(&ctx.services, "Acme", "secret123").await;

    let session = ctx
        .services
        .auth
        .login_as_company("Acme", "secret123")
        .await
        .unwrap();

    assert!(ctx.services.auth.logout(session.id).unwrap());

    let again = ctx.services.auth.logout(session.id);
    assert!(matches!(again, Err(AnteroomError::NotFound { .. })));

    let verify = ctx.services.auth.verify_token(session.id, &session.token);
    assert!(matches!(verify, Err(AnteroomError::NotFound { .. })));
}

#[tokio::test]
async fn get_session_returns_stored_record() {
    let ctx = setup().await;
    seed_company(&ctx.services, "Acme", "secret123").await;

    let session = ctx
        .services
        .auth
        .login_as_company("Acme", "secret123")
        .await
        .unwrap();
    let fetched = ctx.services.auth.get_session(session.id).unwrap();

    assert_eq!(fetched.token, session.token);
    assert_eq!(fetched.subject, session.subject);

    let missing = ctx.services.auth.get_session(SessionId::new(session.id.as_u64().wrapping_add(1)));
    assert!(matches!(missing, Err(AnteroomError::NotFound { .. })));
}

#[tokio::test]
async fn capability_predicates_match_subject_kind() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let user = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;

    let company_subject = SubjectRef::Company(company.id);
    let user_subject = SubjectRef::User(user.id);

    assert!(ctx.services.auth.is_company(&company_subject));
    assert!(!ctx.services.auth.is_user(&company_subject));
    assert!(ctx.services.auth.is_user(&user_subject));
    assert!(ctx.services.auth.is_this_user(&user_subject, user.id));
    assert!(!ctx
        .services
        .auth
        .is_this_user(&user_subject, UserId::new(user.id.as_i64() + 1)));
    assert!(!ctx.services.auth.is_this_user(&company_subject, user.id));
}

#[tokio::test]
async fn is_host_of_reflects_room_hosting() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let host = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;
    let guest = seed_user(&ctx.services, &company, "Jim", "jim@example.com", "hunter22x").await;
    let room = seed_room(&ctx.services, "war-room").await;

    ctx.services
        .participants
        .add_participant(room.id, host.id, ParticipantRole::Host)
        .await
        .unwrap();
    ctx.services
        .participants
        .add_participant(room.id, guest.id, ParticipantRole::Guest)
        .await
        .unwrap();

    let host_subject = SubjectRef::User(host.id);
    let guest_subject = SubjectRef::User(guest.id);
    let company_subject = SubjectRef::Company(company.id);

    assert!(ctx.services.auth.is_host_of(&host_subject, room.id).await.unwrap());
    assert!(!ctx
        .services
        .auth
        .is_host_of(&guest_subject, room.id)
        .await
        .unwrap());
    // A company can never host; a false answer, not an error
    assert!(!ctx
        .services
        .auth
        .is_host_of(&company_subject, room.id)
        .await
        .unwrap());
}
