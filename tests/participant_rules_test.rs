//! Membership invariants: one host per room, no duplicate participation,
//! hosts removable only with their room.

mod common;

use anteroom::auth::models::ParticipantRole;
use anteroom::domain::{ParticipantId, RoomId, UserId};
use anteroom::AnteroomError;

use common::{seed_company, seed_room, seed_user, setup};

#[tokio::test]
async fn add_participant_as_host_and_guest() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let host = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;
    let guest = seed_user(&ctx.services, &company, "Jim", "jim@example.com", "hunter22x").await;
    let room = seed_room(&ctx.services, "war-room").await;

    let host_row = ctx
        .services
        .participants
        .add_participant(room.id, host.id, ParticipantRole::Host)
        .await
        .unwrap();
    assert_eq!(host_row.role, ParticipantRole::Host);

    let guest_row = ctx
        .services
        .participants
        .add_participant(room.id, guest.id, ParticipantRole::Guest)
        .await
        .unwrap();
    assert_eq!(guest_row.role, ParticipantRole::Guest);

    let all = ctx.services.participants.find_all_in_room(room.id).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn second_host_for_room_is_rejected() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let first = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;
    let second = seed_user(&ctx.services, &company, "Jim", "jim@example.com", "hunter22x").await;
    let room = seed_room(&ctx.services, "war-room").await;

    ctx.services
        .participants
        .add_participant(room.id, first.id, ParticipantRole::Host)
        .await
        .unwrap();

    let result = ctx
        .services
        .participants
        .add_participant(room.id, second.id, ParticipantRole::Host)
        .await;
    assert!(matches!(result, Err(AnteroomError::NotSaved { .. })));

    // The failed attempt wrote nothing
    let all = ctx.services.participants.find_all_in_room(room.id).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn duplicate_membership_is_rejected() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let user = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;
    let room = seed_room(&ctx.services, "war-room").await;

    ctx.services
        .participants
        .add_participant(room.id, user.id, ParticipantRole::Guest)
        .await
        .unwrap();

    let again = ctx
        .services
        .participants
        .add_participant(room.id, user.id, ParticipantRole::Guest)
        .await;
    assert!(matches!(again, Err(AnteroomError::Duplicated { .. })));
}

#[tokio::test]
async fn add_participant_requires_existing_room_and_user() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let user = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;
    let room = seed_room(&ctx.services, "war-room").await;

    let no_room = ctx
        .services
        .participants
        .add_participant(
            RoomId::new(room.id.as_i64() + 99),
            user.id,
            ParticipantRole::Guest,
        )
        .await;
    assert!(matches!(no_room, Err(AnteroomError::NotFound { .. })));

    let no_user = ctx
        .services
        .participants
        .add_participant(
            room.id,
            UserId::new(user.id.as_i64() + 99),
            ParticipantRole::Guest,
        )
        .await;
    assert!(matches!(no_user, Err(AnteroomError::NotFound { .. })));
}

#[tokio::test]
async fn guest_can_be_removed_but_host_cannot() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let host = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;
    let guest = seed_user(&ctx.services, &company, "Jim", "jim@example.com", "hunter22x").await;
    let room = seed_room(&ctx.services, "war-room").await;

    let host_row = ctx
        .services
        .participants
        .add_participant(room.id, host.id, ParticipantRole::Host)
        .await
        .unwrap();
    let guest_row = ctx
        .services
        .participants
        .add_participant(room.id, guest.id, ParticipantRole::Guest)
        .await
        .unwrap();

    assert!(ctx
        .services
        .participants
        .remove_participant(guest_row.id)
        .await
        .unwrap());

    let host_removal = ctx.services.participants.remove_participant(host_row.id).await;
    assert!(matches!(host_removal, Err(AnteroomError::NotRemoved { .. })));

    // Host is still in place
    let remaining = ctx.services.participants.find_all_in_room(room.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].role, ParticipantRole::Host);
}

#[tokio::test]
async fn remove_unknown_participant_is_not_found() {
    let ctx = setup().await;

    let result = ctx
        .services
        .participants
        .remove_participant(ParticipantId::new(404))
        .await;
    assert!(matches!(result, Err(AnteroomError::NotFound { .. })));
}

#[tokio::test]
async fn find_host_reports_the_single_host() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let host = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;
    let room = seed_room(&ctx.services, "war-room").await;

    let missing = ctx.services.participants.find_host(room.id).await;
    assert!(matches!(missing, Err(AnteroomError::NotFound { .. })));

    ctx.services
        .participants
        .add_participant(room.id, host.id, ParticipantRole::Host)
        .await
        .unwrap();

    let found = ctx.services.participants.find_host(room.id).await.unwrap();
    assert_eq!(found.user_id, host.id);
    assert_eq!(found.role, ParticipantRole::Host);
}

#[tokio::test]
async fn same_user_may_join_several_rooms() {
    let ctx = setup().await;
    let company = seed_company(&ctx.services, "Acme", "secret123").await;
    let user = seed_user(&ctx.services, &company, "Jan", "jan@example.com", "hunter22x").await;
    let room_a = seed_room(&ctx.services, "alpha").await;
    let room_b = seed_room(&ctx.services, "beta").await;

    ctx.services
        .participants
        .add_participant(room_a.id, user.id, ParticipantRole::Host)
        .await
        .unwrap();
    // Hosting one room does not block membership elsewhere
    ctx.services
        .participants
        .add_participant(room_b.id, user.id, ParticipantRole::Guest)
        .await
        .unwrap();

    let in_a = ctx
        .services
        .participants
        .find_by_user_in_room(user.id, room_a.id)
        .await
        .unwrap();
    let in_b = ctx
        .services
        .participants
        .find_by_user_in_room(user.id, room_b.id)
        .await
        .unwrap();
    assert_eq!(in_a.role, ParticipantRole::Host);
    assert_eq!(in_b.role, ParticipantRole::Guest);
}
