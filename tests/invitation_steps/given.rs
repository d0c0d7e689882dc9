//! Given steps for invitation lifecycle BDD scenarios.

use super::world::{InvitationWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use tenantry::tenancy::{
    domain::{SystemRole, User},
    services::{CompanyTransferRequest, RegisterUserRequest},
};

fn register(world: &mut InvitationWorld, name: &str, role: SystemRole) -> Result<User, eyre::Report> {
    let request = RegisterUserRequest::new(name, format!("{name}@example.com")).with_role(role);
    let user = run_async(world.tenancy.register_user(request))
        .wrap_err_with(|| format!("register user '{name}'"))?;
    world.users.insert(name.to_owned(), user.clone());
    Ok(user)
}

#[given(r#"a company "{company}" administered by "{owner}""#)]
fn company_administered_by(
    world: &mut InvitationWorld,
    company: String,
    owner: String,
) -> Result<(), eyre::Report> {
    let admin = register(world, &owner, SystemRole::Member)?;
    let created = run_async(world.tenancy.create_company(admin.id(), company))
        .wrap_err("create scenario company")?;
    world.company = Some(created);
    Ok(())
}

#[given(r#"a registered user "{name}""#)]
fn registered_user(world: &mut InvitationWorld, name: String) -> Result<(), eyre::Report> {
    register(world, &name, SystemRole::Member)?;
    Ok(())
}

#[given(r#""{name}" is a member of the company"#)]
fn member_of_company(world: &mut InvitationWorld, name: String) -> Result<(), eyre::Report> {
    if world.platform_admin.is_none() {
        let created = register(world, "root", SystemRole::PlatformAdmin)?;
        world.platform_admin = Some(created);
    }
    let root_id = world
        .platform_admin
        .as_ref()
        .map(User::id)
        .ok_or_else(|| eyre::eyre!("no platform admin in scenario world"))?;
    let member = register(world, &name, SystemRole::Member)?;
    let company_id = world.company()?.id();
    run_async(
        world
            .tenancy
            .transfer_or_remove_company(CompanyTransferRequest::transfer(
                root_id,
                member.id(),
                company_id,
            )),
    )
    .wrap_err("place member in company")?;
    Ok(())
}
