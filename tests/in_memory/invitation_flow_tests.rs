//! Onboarding through invitations against the shared in-memory store.

use super::helpers::{Engine, engine};
use chrono::TimeDelta;
use rstest::rstest;
use std::sync::Arc;
use tenantry::{
    authz::domain::{EffectiveRole, RequiredRoles},
    error::{Classified, ErrorKind},
    invitation::{domain::InvitationStatus, services::AcceptInvitationError},
    tenancy::{
        domain::{BoardRole, SystemRole},
        ports::TenancyRepository,
        services::CompanyTransferRequest,
    },
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invited_user_joins_and_gains_board_access(engine: Engine) {
    let acme = engine
        .seed_company("olive", "Acme")
        .await
        .expect("seed company");
    let ivy = engine
        .register("ivy", SystemRole::Member)
        .await
        .expect("register invitee");

    let issued = engine
        .invitations
        .issue(acme.owner.id(), acme.company.id(), "ivy@example.com")
        .await
        .expect("issue invitation");
    engine
        .invitations
        .accept(ivy.id(), issued.token.expose())
        .await
        .expect("accept invitation");
    engine
        .tenancy
        .add_board_member(acme.owner.id(), acme.board.id(), ivy.id(), BoardRole::Editor)
        .await
        .expect("grant board role");

    let effective = engine
        .tenancy
        .resolver()
        .resolve_effective_role(ivy.id(), acme.board.id())
        .await
        .expect("resolve role");
    assert_eq!(effective, Some(EffectiveRole::Explicit(BoardRole::Editor)));
    let can_edit = engine
        .tenancy
        .resolver()
        .has_permission(ivy.id(), acme.board.id(), &RequiredRoles::EDITORS)
        .await
        .expect("check permission");
    assert!(can_edit);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_accepts_succeed_exactly_once(engine: Engine) {
    let acme = engine
        .seed_company("olive", "Acme")
        .await
        .expect("seed company");
    let ivy = engine
        .register("ivy", SystemRole::Member)
        .await
        .expect("register invitee");
    let issued = engine
        .invitations
        .issue(acme.owner.id(), acme.company.id(), "ivy@example.com")
        .await
        .expect("issue invitation");
    let token = issued.token.expose().to_owned();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&engine.invitations);
        let presented = token.clone();
        let user_id = ivy.id();
        handles.push(tokio::spawn(async move {
            service.accept(user_id, &presented).await
        }));
    }
    let mut accepted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.expect("accept task completes") {
            Ok(_) => accepted += 1,
            Err(AcceptInvitationError::NotPending(InvitationStatus::Accepted)) => refused += 1,
            Err(other) => panic!("unexpected acceptance error: {other}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(refused, 7);
    let joined = engine
        .store
        .find_user(ivy.id())
        .await
        .expect("lookup user")
        .expect("user exists");
    assert_eq!(joined.company_id(), Some(acme.company.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_invitation_cannot_be_used_later(engine: Engine) {
    let acme = engine
        .seed_company("olive", "Acme")
        .await
        .expect("seed company");
    let ivy = engine
        .register("ivy", SystemRole::Member)
        .await
        .expect("register invitee");
    let issued = engine
        .invitations
        .issue(acme.owner.id(), acme.company.id(), "ivy@example.com")
        .await
        .expect("issue invitation");
    engine.clock.advance(TimeDelta::days(7) + TimeDelta::minutes(1));

    let preview = engine.invitations.preview(issued.token.expose()).await;
    let accept = engine
        .invitations
        .accept(ivy.id(), issued.token.expose())
        .await;

    assert!(matches!(preview, Err(AcceptInvitationError::Expired(_))));
    let err = accept.expect_err("expired invitation is refused");
    assert!(matches!(
        err,
        AcceptInvitationError::NotPending(InvitationStatus::Expired)
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn removed_member_can_be_invited_back(engine: Engine) {
    let acme = engine
        .seed_company("olive", "Acme")
        .await
        .expect("seed company");
    let ivy = engine
        .register("ivy", SystemRole::Member)
        .await
        .expect("register invitee");
    let first = engine
        .invitations
        .issue(acme.owner.id(), acme.company.id(), "ivy@example.com")
        .await
        .expect("issue invitation");
    engine
        .invitations
        .accept(ivy.id(), first.token.expose())
        .await
        .expect("accept invitation");
    engine
        .tenancy
        .transfer_or_remove_company(CompanyTransferRequest::remove(acme.owner.id(), ivy.id()))
        .await
        .expect("remove member");

    let second = engine
        .invitations
        .issue(acme.owner.id(), acme.company.id(), "ivy@example.com")
        .await
        .expect("issue second invitation");
    engine
        .invitations
        .accept(ivy.id(), second.token.expose())
        .await
        .expect("accept second invitation");

    let listed = engine
        .invitations
        .list_for_company(acme.owner.id(), acme.company.id())
        .await
        .expect("list invitations");
    let statuses: Vec<_> = listed.iter().map(|inv| inv.status()).collect();
    assert_eq!(
        statuses,
        vec![InvitationStatus::Accepted, InvitationStatus::Accepted]
    );
}
