//! Session context behaviour as tenancy changes underneath it.

use super::helpers::{Engine, engine};
use rstest::rstest;
use tenantry::{
    session::services::SessionError,
    tenancy::{domain::SystemRole, services::CompanyTransferRequest},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transferred_company_admin_loses_the_old_board(engine: Engine) {
    let acme = engine
        .seed_company("olive", "Acme")
        .await
        .expect("seed acme");
    let globex = engine
        .seed_company("gus", "Globex")
        .await
        .expect("seed globex");
    let root = engine
        .register("root", SystemRole::PlatformAdmin)
        .await
        .expect("register root");
    let deputy = engine
        .register("dee", SystemRole::Member)
        .await
        .expect("register deputy");
    engine
        .tenancy
        .transfer_or_remove_company(
            CompanyTransferRequest::transfer(root.id(), deputy.id(), acme.company.id())
                .granting_admin(),
        )
        .await
        .expect("place deputy as admin");
    engine
        .sessions
        .set_active_board(deputy.id(), acme.board.id())
        .await
        .expect("deputy selects acme board");

    engine
        .tenancy
        .transfer_or_remove_company(CompanyTransferRequest::transfer(
            root.id(),
            deputy.id(),
            globex.company.id(),
        ))
        .await
        .expect("move deputy");
    let context = engine
        .sessions
        .revalidate(deputy.id())
        .await
        .expect("revalidate")
        .expect("context kept");

    assert_eq!(context.active_board_id(), None);
    assert_eq!(context.active_company_id(), Some(globex.company.id()));
    let retry = engine
        .sessions
        .set_active_board(deputy.id(), acme.board.id())
        .await;
    assert!(matches!(retry, Err(SessionError::Unauthorized { .. })));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn platform_admin_view_survives_revalidation(engine: Engine) {
    let acme = engine
        .seed_company("olive", "Acme")
        .await
        .expect("seed acme");
    let root = engine
        .register("root", SystemRole::PlatformAdmin)
        .await
        .expect("register root");
    engine
        .sessions
        .set_active_board(root.id(), acme.board.id())
        .await
        .expect("root selects acme board");

    let context = engine
        .sessions
        .revalidate(root.id())
        .await
        .expect("revalidate")
        .expect("context kept");

    assert_eq!(context.active_board_id(), Some(acme.board.id()));
    assert_eq!(context.cross_tenant_company_id(), Some(acme.company.id()));
}
