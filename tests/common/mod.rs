//! Shared setup for integration tests: an isolated in-memory database per
//! test, the wired service graph, and a notifier that records deliveries.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;

use anteroom::auth::models::{Company, NewCompany, NewUser, Room, User};
use anteroom::auth::InvitationNotifier;
use anteroom::config::AuthConfig;
use anteroom::{Result, ServiceGraph};

/// A recorded invitation notification.
#[derive(Debug, Clone)]
pub struct RecordedNotification {
    pub recipient_email: String,
    pub room_name: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Notifier that captures every delivery for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<RecordedNotification>>,
}

impl RecordingNotifier {
    pub fn recorded(&self) -> Vec<RecordedNotification> {
        self.notifications.lock().expect("notifier lock").clone()
    }
}

#[async_trait]
impl InvitationNotifier for RecordingNotifier {
    async fn notify_invitation(
        &self,
        recipient_email: &str,
        _recipient_name: &str,
        room_name: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.notifications
            .lock()
            .expect("notifier lock")
            .push(RecordedNotification {
                recipient_email: recipient_email.to_string(),
                room_name: room_name.to_string(),
                code: code.to_string(),
                expires_at,
            });
        Ok(())
    }
}

pub struct TestContext {
    pub services: ServiceGraph,
    pub notifier: Arc<RecordingNotifier>,
}

/// Build a service graph over a fresh in-memory database with default TTLs.
pub async fn setup() -> TestContext {
    setup_with_auth_config(AuthConfig::default()).await
}

/// Build a service graph with custom lifetimes (e.g. zero TTL for expiry tests).
pub async fn setup_with_auth_config(auth: AuthConfig) -> TestContext {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("create sqlite pool");

    anteroom::storage::run_migrations(&pool)
        .await
        .expect("run migrations for tests");

    let notifier = Arc::new(RecordingNotifier::default());
    let services = ServiceGraph::with_pool(
        pool,
        &auth,
        Arc::clone(&notifier) as Arc<dyn InvitationNotifier>,
    );

    TestContext { services, notifier }
}

/// Wait for the fire-and-forget notification task to land, up to one second.
pub async fn wait_for_notifications(notifier: &RecordingNotifier, expected: usize) {
    for _ in 0..100 {
        if notifier.recorded().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} notifications, saw {}",
        expected,
        notifier.recorded().len()
    );
}

pub async fn seed_company(services: &ServiceGraph, name: &str, password: &str) -> Company {
    services
        .companies
        .register(NewCompany {
            name: name.to_string(),
            password: password.to_string(),
        })
        .await
        .expect("register company")
}

pub async fn seed_user(
    services: &ServiceGraph,
    company: &Company,
    name: &str,
    email: &str,
    password: &str,
) -> User {
    services
        .users
        .register(NewUser {
            company_id: company.id,
            name: name.to_string(),
            role: "Developer".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })
        .await
        .expect("register user")
}

pub async fn seed_room(services: &ServiceGraph, name: &str) -> Room {
    services.rooms.create(name).await.expect("create room")
}
