//! Out-of-band delivery of invitation codes.
//!
//! The core treats notification as a best-effort collaborator: issuance has
//! already committed by the time a notifier runs, and a delivery failure never
//! rolls the invitation back. Message assembly is plain string templating;
//! user-controlled values are never handed to a shell or interpreter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::errors::Result;

/// Collaborator interface for telling an invited user their entry code.
#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    async fn notify_invitation(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        room_name: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Notifier that renders the invitation message into the structured log.
///
/// Suitable for development and for deployments where delivery is handled by
/// an external process tailing the log stream.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }

    fn render(recipient_name: &str, room_name: &str, code: &str, expires_at: DateTime<Utc>) -> String {
        format!(
            "Welcome, {}\nRoom {} invites you\nYour entry code is {}\nExpires at: {}",
            recipient_name,
            room_name,
            code,
            expires_at.to_rfc3339()
        )
    }
}

#[async_trait]
impl InvitationNotifier for LogNotifier {
    #[instrument(skip(self, code), fields(recipient = %recipient_email, room = %room_name))]
    async fn notify_invitation(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        room_name: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let body = Self::render(recipient_name, room_name, code, expires_at);
        let envelope = serde_json::json!({
            "to": recipient_email,
            "subject": "[Secure Chat Service] Room invitation",
            "expiresAt": expires_at,
        });
        info!(
            envelope = %envelope,
            body_lines = body.lines().count(),
            "invitation notification dispatched"
        );
        Ok(())
    }
}
