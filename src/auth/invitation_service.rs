//! Invitation manager: issuing and redeeming one-time room-entry codes.
//!
//! The central correctness property is the destructive compare: a given
//! invitation secret authorizes at most one successful redemption. A matching
//! code deletes the invitation in the same transaction that read it; a
//! mismatch rolls back and leaves it intact for further attempts until expiry.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::auth::models::Invitation;
use crate::auth::notifier::InvitationNotifier;
use crate::auth::secrets;
use crate::config::AuthConfig;
use crate::domain::{RoomId, UserId};
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::{
    InvitationRepository, RoomRepository, SqlxInvitationRepository, SqlxRoomRepository,
    SqlxUserRepository, UserRepository,
};
use crate::storage::DbPool;

/// Service for managing room invitations.
#[derive(Clone)]
pub struct InvitationService {
    pool: DbPool,
    invitation_repo: Arc<dyn InvitationRepository>,
    user_repo: Arc<dyn UserRepository>,
    room_repo: Arc<dyn RoomRepository>,
    notifier: Arc<dyn InvitationNotifier>,
    invite_ttl: chrono::Duration,
    code_length: usize,
}

impl InvitationService {
    pub fn new(
        pool: DbPool,
        invitation_repo: Arc<dyn InvitationRepository>,
        user_repo: Arc<dyn UserRepository>,
        room_repo: Arc<dyn RoomRepository>,
        notifier: Arc<dyn InvitationNotifier>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            pool,
            invitation_repo,
            user_repo,
            room_repo,
            notifier,
            invite_ttl: config.invite_ttl(),
            code_length: config.invite_code_length,
        }
    }

    pub fn with_sqlx(
        pool: DbPool,
        notifier: Arc<dyn InvitationNotifier>,
        config: &AuthConfig,
    ) -> Self {
        Self::new(
            pool,
            Arc::new(SqlxInvitationRepository::new()),
            Arc::new(SqlxUserRepository::new()),
            Arc::new(SqlxRoomRepository::new()),
            notifier,
            config,
        )
    }

    /// Issue a one-time entry code for `(user, room)`.
    ///
    /// Fails `Duplicated` while a live invitation exists for the pair; an
    /// expired leftover is purged in the same transaction and replaced. After
    /// commit the notifier runs fire-and-forget on a spawned task.
    #[instrument(skip(self), fields(user_id = %user_id, room_id = %room_id))]
    pub async fn issue(&self, user_id: UserId, room_id: RoomId) -> Result<Invitation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        let user = self
            .user_repo
            .find_by_id(&mut tx, user_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("user", user_id))?;
        let room = self
            .room_repo
            .find_by_id(&mut tx, room_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("room", room_id))?;

        if let Some(existing) = self
            .invitation_repo
            .find_by_user_in_room(&mut tx, user_id, room_id)
            .await?
        {
            if existing.is_expired(Utc::now()) {
                if !self.invitation_repo.delete(&mut tx, existing.id).await? {
                    return Err(AnteroomError::not_removed(format!(
                        "expired invitation {} could not be purged",
                        existing.id
                    )));
                }
            } else {
                return Err(AnteroomError::duplicated(
                    format!(
                        "user {} already holds an invitation into room {}",
                        user_id, room_id
                    ),
                    "invitation",
                ));
            }
        }

        let code = secrets::generate_invite_code(self.code_length);
        let expires_at = Utc::now() + self.invite_ttl;
        let invitation = self
            .invitation_repo
            .insert(&mut tx, room_id, user_id, &code, expires_at)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit invitation"))?;

        // Best-effort delivery; the invitation stands regardless of outcome.
        let notifier = Arc::clone(&self.notifier);
        let notify_code = invitation.code.clone();
        let notify_expires = invitation.expires_at;
        tokio::spawn(async move {
            if let Err(error) = notifier
                .notify_invitation(
                    &user.email,
                    &user.name,
                    &room.name,
                    &notify_code,
                    notify_expires,
                )
                .await
            {
                warn!(%error, user_id = %user_id, room_id = %room_id, "invitation notification failed");
            }
        });

        info!(
            invitation_id = %invitation.id,
            user_id = %user_id,
            room_id = %room_id,
            expires_at = %invitation.expires_at,
            "invitation issued"
        );
        Ok(invitation)
    }

    /// Fetch the live invitation for `(user, room)`.
    ///
    /// An expired invitation is purged and reported `NotFound`, so callers
    /// cannot distinguish expiry from absence.
    #[instrument(skip(self), fields(user_id = %user_id, room_id = %room_id))]
    pub async fn find_by_user_in_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<Invitation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        let invitation = self
            .invitation_repo
            .find_by_user_in_room(&mut tx, user_id, room_id)
            .await?
            .ok_or_else(|| {
                AnteroomError::not_found("invitation", format!("user:{} room:{}", user_id, room_id))
            })?;

        if invitation.is_expired(Utc::now()) {
            self.invitation_repo.delete(&mut tx, invitation.id).await?;
            tx.commit()
                .await
                .map_err(|e| AnteroomError::database(e, "Failed to commit expiry purge"))?;
            return Err(AnteroomError::not_found(
                "invitation",
                format!("user:{} room:{}", user_id, room_id),
            ));
        }

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit transaction"))?;
        Ok(invitation)
    }

    /// Redeem an entry code.
    ///
    /// Correct code: the invitation is consumed and the call returns true —
    /// a second attempt with the same arguments fails `NotFound`. Wrong code:
    /// the transaction rolls back, the invitation stays, and the call returns
    /// false. Expired or absent invitation: `NotFound` (the purge of an
    /// expired row is committed before the failure is reported).
    #[instrument(skip(self, supplied_code), fields(user_id = %user_id, room_id = %room_id))]
    pub async fn compare(
        &self,
        user_id: UserId,
        room_id: RoomId,
        supplied_code: &str,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        let invitation = self
            .invitation_repo
            .find_by_user_in_room(&mut tx, user_id, room_id)
            .await?
            .ok_or_else(|| {
                AnteroomError::not_found("invitation", format!("user:{} room:{}", user_id, room_id))
            })?;

        if invitation.is_expired(Utc::now()) {
            self.invitation_repo.delete(&mut tx, invitation.id).await?;
            tx.commit()
                .await
                .map_err(|e| AnteroomError::database(e, "Failed to commit expiry purge"))?;
            info!(invitation_id = %invitation.id, "expired invitation purged on redemption attempt");
            return Err(AnteroomError::not_found(
                "invitation",
                format!("user:{} room:{}", user_id, room_id),
            ));
        }

        if secrets::constant_time_eq(supplied_code, &invitation.code) {
            if !self.invitation_repo.delete(&mut tx, invitation.id).await? {
                return Err(AnteroomError::not_removed(format!(
                    "invitation {} could not be consumed",
                    invitation.id
                )));
            }
            tx.commit()
                .await
                .map_err(|e| AnteroomError::database(e, "Failed to commit redemption"))?;
            info!(
                invitation_id = %invitation.id,
                user_id = %user_id,
                room_id = %room_id,
                "invitation redeemed"
            );
            Ok(true)
        } else {
            // Wrong code: leave the invitation intact, retries permitted until expiry
            tx.rollback()
                .await
                .map_err(|e| AnteroomError::database(e, "Failed to roll back transaction"))?;
            Ok(false)
        }
    }
}
