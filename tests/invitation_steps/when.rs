//! When steps for invitation lifecycle BDD scenarios.

use super::world::{InvitationWorld, run_async};
use chrono::TimeDelta;
use rstest_bdd_macros::when;

#[when(r#""{issuer}" invites "{email}" to the company"#)]
fn invite(world: &mut InvitationWorld, issuer: String, email: String) -> Result<(), eyre::Report> {
    let issuer_id = world.user(&issuer)?.id();
    let company_id = world.company()?.id();
    world.last_issue_result = Some(run_async(
        world.invitations.issue(issuer_id, company_id, &email),
    ));
    Ok(())
}

#[when(r#""{name}" accepts the invitation"#)]
fn accept(world: &mut InvitationWorld, name: String) -> Result<(), eyre::Report> {
    let user_id = world.user(&name)?.id();
    let token = world.issued()?.token.expose().to_owned();
    world.last_accept_result = Some(run_async(world.invitations.accept(user_id, &token)));
    Ok(())
}

#[when("{days:i64} days pass")]
fn days_pass(world: &mut InvitationWorld, days: i64) {
    world.clock.advance(TimeDelta::days(days));
}
