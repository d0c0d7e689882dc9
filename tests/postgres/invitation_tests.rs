//! Invitation lifecycle against the `PostgreSQL` store.

use super::helpers::{PgEngine, setup_engine, test_runtime};
use chrono::TimeDelta;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use tenantry::{
    invitation::{
        domain::{Invitation, InvitationStatus, IssuedInvitation},
        ports::{InvitationAcceptance, InvitationRepository, InvitationRepositoryError},
        services::AcceptInvitationError,
    },
    tenancy::{
        domain::{CompanyTransition, SystemRole, User},
        ports::TenancyRepository,
    },
};

/// Seeds Acme, registers `ivy`, and invites `ivy@example.com` to Acme.
async fn invited(engine: &PgEngine<'_>) -> (User, IssuedInvitation) {
    let acme = engine.seed_company("olive", "Acme").await;
    let invitee = engine.register("ivy", SystemRole::Member).await;
    let issued = engine
        .invitations
        .issue(acme.owner.id(), acme.company.id(), "ivy@example.com")
        .await
        .expect("issue invitation");
    (invitee, issued)
}

async fn status_of(engine: &PgEngine<'_>, issued: &IssuedInvitation) -> InvitationStatus {
    engine
        .store
        .find_by_id(issued.invitation.id())
        .await
        .expect("lookup invitation")
        .expect("invitation exists")
        .status()
}

#[rstest]
fn concurrent_accepts_commit_exactly_once(shared_test_cluster: &'static TestCluster) {
    let engine = setup_engine(shared_test_cluster, "accept_once").expect("engine setup");
    let rt = test_runtime();

    rt.block_on(async {
        let (invitee, issued) = invited(&engine).await;
        let token = issued.token.expose();
        let service = &engine.invitations;
        let user_id = invitee.id();

        let (first, second, third, fourth) = tokio::join!(
            service.accept(user_id, token),
            service.accept(user_id, token),
            service.accept(user_id, token),
            service.accept(user_id, token),
        );

        let mut accepted = 0;
        for result in [first, second, third, fourth] {
            match result {
                Ok(invitation) => {
                    accepted += 1;
                    assert_eq!(invitation.status(), InvitationStatus::Accepted);
                }
                Err(AcceptInvitationError::NotPending(InvitationStatus::Accepted)) => {}
                Err(other) => panic!("unexpected acceptance error: {other}"),
            }
        }
        assert_eq!(accepted, 1);
        let joined = engine
            .store
            .find_user(invitee.id())
            .await
            .expect("lookup user")
            .expect("user exists");
        assert_eq!(joined.company_id(), Some(issued.invitation.company_id()));
    });
}

#[rstest]
fn lapsed_invitation_is_expired_when_read(shared_test_cluster: &'static TestCluster) {
    let engine = setup_engine(shared_test_cluster, "lazy_expiry").expect("engine setup");
    let rt = test_runtime();

    rt.block_on(async {
        let (invitee, issued) = invited(&engine).await;
        assert_eq!(status_of(&engine, &issued).await, InvitationStatus::Pending);
        engine.clock.advance(TimeDelta::days(7) + TimeDelta::minutes(1));

        let preview = engine.invitations.preview(issued.token.expose()).await;

        assert!(matches!(
            preview,
            Err(AcceptInvitationError::Expired(at)) if at == issued.invitation.expires_at()
        ));
        assert_eq!(status_of(&engine, &issued).await, InvitationStatus::Expired);
        let accept = engine
            .invitations
            .accept(invitee.id(), issued.token.expose())
            .await;
        assert!(matches!(
            accept,
            Err(AcceptInvitationError::NotPending(InvitationStatus::Expired))
        ));
    });
}

#[rstest]
fn acceptance_past_expiry_is_refused_at_commit(shared_test_cluster: &'static TestCluster) {
    let engine = setup_engine(shared_test_cluster, "lapsed_commit").expect("engine setup");
    let rt = test_runtime();

    rt.block_on(async {
        let (invitee, issued) = invited(&engine).await;
        engine.clock.advance(TimeDelta::days(8));
        let late = CompanyTransition::plan(
            &invitee,
            Some(issued.invitation.company_id()),
            false,
            &*engine.clock,
        );

        let result = engine
            .store
            .accept(&InvitationAcceptance {
                invitation_id: issued.invitation.id(),
                transition: late,
                at: late.at(),
            })
            .await;

        assert!(matches!(
            result,
            Err(InvitationRepositoryError::Lapsed { expires_at, .. })
                if expires_at == issued.invitation.expires_at()
        ));
        assert_eq!(status_of(&engine, &issued).await, InvitationStatus::Expired);
        let user = engine
            .store
            .find_user(invitee.id())
            .await
            .expect("lookup user")
            .expect("user exists");
        assert_eq!(user.company_id(), None);
    });
}

#[rstest]
fn second_pending_invitation_maps_to_duplicate_pending(
    shared_test_cluster: &'static TestCluster,
) {
    let engine = setup_engine(shared_test_cluster, "dup_pending").expect("engine setup");
    let rt = test_runtime();

    rt.block_on(async {
        let (_, issued) = invited(&engine).await;
        let again = Invitation::issue(
            issued.invitation.company_id(),
            issued.invitation.email().clone(),
            issued.invitation.issued_by(),
            TimeDelta::days(7),
            &*engine.clock,
        );

        let result = engine.store.insert_pending(&again.invitation).await;

        assert!(matches!(
            result,
            Err(InvitationRepositoryError::DuplicatePending { company_id, .. })
                if company_id == issued.invitation.company_id()
        ));
        let listed = engine
            .store
            .list_for_company(issued.invitation.company_id())
            .await
            .expect("list invitations");
        assert_eq!(listed.len(), 1);
    });
}
