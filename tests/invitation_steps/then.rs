//! Then steps for invitation lifecycle BDD scenarios.

use super::world::{InvitationWorld, run_async};
use rstest_bdd_macros::then;
use tenantry::{
    invitation::{
        domain::InvitationStatus,
        ports::InvitationRepository,
        services::{AcceptInvitationError, IssueInvitationError},
    },
    tenancy::{domain::SystemRole, ports::TenancyRepository},
};

fn stored_status(world: &InvitationWorld) -> Result<InvitationStatus, eyre::Report> {
    let id = world.issued()?.invitation.id();
    let invitation = run_async(world.store.find_by_id(id))
        .map_err(|err| eyre::eyre!("invitation lookup failed: {err}"))?
        .ok_or_else(|| eyre::eyre!("invitation {id} is missing"))?;
    Ok(invitation.status())
}

fn expect_status(world: &InvitationWorld, expected: InvitationStatus) -> Result<(), eyre::Report> {
    let status = stored_status(world)?;
    if status != expected {
        return Err(eyre::eyre!("expected invitation to be {expected}, found {status}"));
    }
    Ok(())
}

fn last_acceptance_error(world: &InvitationWorld) -> Result<&AcceptInvitationError, eyre::Report> {
    match world.last_accept_result.as_ref() {
        Some(Err(err)) => Ok(err),
        Some(Ok(_)) => Err(eyre::eyre!("expected the last acceptance to fail")),
        None => Err(eyre::eyre!("no acceptance attempted in scenario world")),
    }
}

#[then(r#""{name}" belongs to the company as a member"#)]
fn belongs_as_member(world: &mut InvitationWorld, name: String) -> Result<(), eyre::Report> {
    let user_id = world.user(&name)?.id();
    let company_id = world.company()?.id();
    let user = run_async(world.store.find_user(user_id))
        .map_err(|err| eyre::eyre!("user lookup failed: {err}"))?
        .ok_or_else(|| eyre::eyre!("user '{name}' is missing"))?;
    if user.company_id() != Some(company_id) || user.role() != SystemRole::Member {
        return Err(eyre::eyre!(
            "expected '{name}' to be a member of {company_id}, found {:?} as {}",
            user.company_id(),
            user.role()
        ));
    }
    Ok(())
}

#[then(r#""{name}" belongs to no company"#)]
fn belongs_to_no_company(world: &mut InvitationWorld, name: String) -> Result<(), eyre::Report> {
    let user_id = world.user(&name)?.id();
    let user = run_async(world.store.find_user(user_id))
        .map_err(|err| eyre::eyre!("user lookup failed: {err}"))?
        .ok_or_else(|| eyre::eyre!("user '{name}' is missing"))?;
    if let Some(company_id) = user.company_id() {
        return Err(eyre::eyre!("expected '{name}' to be unplaced, found {company_id}"));
    }
    Ok(())
}

#[then("the invitation is accepted")]
fn invitation_accepted(world: &mut InvitationWorld) -> Result<(), eyre::Report> {
    expect_status(world, InvitationStatus::Accepted)
}

#[then("the invitation is expired")]
fn invitation_expired(world: &mut InvitationWorld) -> Result<(), eyre::Report> {
    expect_status(world, InvitationStatus::Expired)
}

#[then("the invitation is pending")]
fn invitation_pending(world: &mut InvitationWorld) -> Result<(), eyre::Report> {
    expect_status(world, InvitationStatus::Pending)
}

#[then("the last acceptance is refused as no longer pending")]
fn refused_not_pending(world: &mut InvitationWorld) -> Result<(), eyre::Report> {
    let err = last_acceptance_error(world)?;
    if !matches!(err, AcceptInvitationError::NotPending(InvitationStatus::Accepted)) {
        return Err(eyre::eyre!("expected a not-pending refusal, got {err:?}"));
    }
    Ok(())
}

#[then("the last acceptance is refused as expired")]
fn refused_expired(world: &mut InvitationWorld) -> Result<(), eyre::Report> {
    let err = last_acceptance_error(world)?;
    if !matches!(err, AcceptInvitationError::Expired(_)) {
        return Err(eyre::eyre!("expected an expiry refusal, got {err:?}"));
    }
    Ok(())
}

#[then("the last acceptance is refused for a different email")]
fn refused_email_mismatch(world: &mut InvitationWorld) -> Result<(), eyre::Report> {
    let err = last_acceptance_error(world)?;
    if !matches!(err, AcceptInvitationError::EmailMismatch) {
        return Err(eyre::eyre!("expected an email mismatch, got {err:?}"));
    }
    Ok(())
}

#[then("the last issue is refused as unauthorized")]
fn issue_unauthorized(world: &mut InvitationWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_issue_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no issue attempted in scenario world"))?;
    if !matches!(result, Err(IssueInvitationError::Unauthorized { .. })) {
        return Err(eyre::eyre!("expected an unauthorized refusal, got {result:?}"));
    }
    Ok(())
}
