//! Company and user account lifecycle: registration keeps the credential row
//! in lockstep, removal cleans it up, and rotated passwords take effect.

mod common;

use anteroom::auth::models::{NewCompany, NewUser};
use anteroom::AnteroomError;

use common::{seed_company, seed_user, setup};

#[tokio::test]
async fn register_company_then_login() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;

    let found = ctx.services.companies.find_by_name("Acme").await.unwrap();
    assert_eq!(found.id, company.id);

    let session = ctx
        .services
        .auth
        .login_as_company("Acme", "secret123")
        .await
        .unwrap();
    assert!(session.subject.is_company());
}

#[tokio::test]
async fn duplicate_company_name_is_rejected() {
    let ctx = setup().await;
    seed_company(&ctx.services, "Acme", "secret123").await;

    let again = ctx
        .services
        .companies
        .register(NewCompany {
            name: "Acme".to_string(),
            password: "other-secret".to_string(),
        })
        .await;
    assert!(matches!(again, Err(AnteroomError::Duplicated { .. })));
}

#[tokio::test]
async fn register_user_requires_existing_company() {
    let ctx = setup().await;

    let result = ctx
        .services
        .users
        .register(NewUser {
            company_id: anteroom::domain::CompanyId::new(404),
            name: "Jan".to_string(),
            role: "Boss".to_string(),
            email: "jan@example.com".to_string(),
            password: "hunter22x".to_string(),
        })
        .await;
    assert!(matches!(result, Err(AnteroomError::NotFound { .. })));
}

#[tokio::test]
async fn duplicate_user_email_is_rejected() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;

    let again = ctx
        .services
        .users
        .register(NewUser {
            company_id: company.id,
            name: "Impostor".to_string(),
            role: "Boss".to_string(),
            email: "jan@example.com".to_string(),
            password: "different1".to_string(),
        })
        .await;
    assert!(matches!(again, Err(AnteroomError::Duplicated { .. })));
}

#[tokio::test]
async fn invalid_registration_payload_fails_validation() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;

    let bad_email = ctx
        .services
        .users
        .register(NewUser {
            company_id: company.id,
            name: "Jan".to_string(),
            role: "Boss".to_string(),
            email: "not-an-email".to_string(),
            password: "hunter22x".to_string(),
        })
        .await;
    assert!(matches!(bad_email, Err(AnteroomError::Validation { .. })));

    let short_password = ctx
        .services
        .companies
        .register(NewCompany {
            name: "Globex".to_string(),
            password: "short".to_string(),
        })
        .await;
    assert!(matches!(short_password, Err(AnteroomError::Validation { .. })));
}

#[tokio::test]
async fn password_rotation_takes_effect() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let user = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;

    ctx.services
        .users
        .update_password(user.id, "new-password-1")
        .await
        .unwrap();

    let stale = ctx
        .services
        .auth
        .login_as_user("jan@example.com", "hunter22x")
        .await;
    assert!(matches!(stale, Err(AnteroomError::Auth { .. })));

    let fresh = ctx
        .services
        .auth
        .login_as_user("jan@example.com", "new-password-1")
        .await;
    assert!(fresh.is_ok());
}

#[tokio::test]
async fn removing_user_removes_credential_and_blocks_login() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let user = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;

    assert!(ctx.services.users.remove(user.id).await.unwrap());

    let lookup = ctx.services.users.find_by_email("jan@example.com").await;
    assert!(matches!(lookup, Err(AnteroomError::NotFound { .. })));

    // The credential row went with the user: no orphan remains
    let credential_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM credentials WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(ctx.services.pool())
        .await
        .unwrap();
    assert_eq!(credential_count.0, 0);

    let login = ctx
        .services
        .auth
        .login_as_user("jan@example.com", "hunter22x")
        .await;
    assert!(matches!(login, Err(AnteroomError::NotFound { .. })));
}

#[tokio::test]
async fn update_profile_changes_name_and_role() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let user = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;

    let updated = ctx
        .services
        .users
        .update_profile(user.id, "Jan Levinson", "VP North-East")
        .await
        .unwrap();

    assert_eq!(updated.name, "Jan Levinson");
    assert_eq!(updated.role, "VP North-East");
    assert_eq!(updated.email, "jan@example.com");
}

#[tokio::test]
async fn removing_company_removes_its_credential() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;

    assert!(ctx.services.companies.remove(company.id).await.unwrap());

    let login = ctx
        .services
        .auth
        .login_as_company("Acme", "secret123")
        .await;
    assert!(matches!(login, Err(AnteroomError::NotFound { .. })));

    let credential_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM credentials WHERE company_id = $1")
            .bind(company.id)
            .fetch_one(ctx.services.pool())
            .await
            .unwrap();
    assert_eq!(credential_count.0, 0);
}
