//! Company moves and administrative invariants across services.

use super::helpers::{Engine, engine};
use rstest::rstest;
use tenantry::{
    authz::domain::EffectiveRole,
    error::{Classified, ErrorKind},
    tenancy::{
        domain::{BoardRole, SystemRole},
        ports::TenancyRepository,
        services::{CompanyTransferRequest, TenancyServiceError},
    },
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn platform_transfer_moves_access_between_companies(engine: Engine) {
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
    let mia = engine
        .register("mia", SystemRole::Member)
        .await
        .expect("register mia");
    engine
        .tenancy
        .transfer_or_remove_company(CompanyTransferRequest::transfer(
            root.id(),
            mia.id(),
            acme.company.id(),
        ))
        .await
        .expect("place mia in acme");
    engine
        .tenancy
        .add_board_member(acme.owner.id(), acme.board.id(), mia.id(), BoardRole::Admin)
        .await
        .expect("grant acme board");

    let outcome = engine
        .tenancy
        .transfer_or_remove_company(CompanyTransferRequest::transfer(
            root.id(),
            mia.id(),
            globex.company.id(),
        ))
        .await
        .expect("move mia to globex");

    assert_eq!(outcome.removed_memberships, 1);
    let memberships = engine
        .store
        .list_memberships_for_user(mia.id())
        .await
        .expect("list memberships");
    assert!(memberships.is_empty());
    let old_board = engine
        .tenancy
        .resolver()
        .resolve_effective_role(mia.id(), acme.board.id())
        .await
        .expect("resolve old board");
    assert_eq!(old_board, None);
    engine
        .tenancy
        .add_board_member(globex.owner.id(), globex.board.id(), mia.id(), BoardRole::Viewer)
        .await
        .expect("grant globex board");
    let new_board = engine
        .tenancy
        .resolver()
        .resolve_effective_role(mia.id(), globex.board.id())
        .await
        .expect("resolve new board");
    assert_eq!(new_board, Some(EffectiveRole::Explicit(BoardRole::Viewer)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn last_company_admin_cannot_be_moved_out(engine: Engine) {
    let acme = engine
        .seed_company("olive", "Acme")
        .await
        .expect("seed acme");
    let root = engine
        .register("root", SystemRole::PlatformAdmin)
        .await
        .expect("register root");

    let err = engine
        .tenancy
        .transfer_or_remove_company(CompanyTransferRequest::remove(root.id(), acme.owner.id()))
        .await
        .expect_err("the last admin stays");

    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    assert_eq!(err.reason_code(), "last_company_admin");
    let owner = engine
        .store
        .find_user(acme.owner.id())
        .await
        .expect("lookup owner")
        .expect("owner exists");
    assert_eq!(owner.company_id(), Some(acme.company.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn company_admin_override_covers_boards_created_by_others(engine: Engine) {
    let acme = engine
        .seed_company("olive", "Acme")
        .await
        .expect("seed acme");
    let root = engine
        .register("root", SystemRole::PlatformAdmin)
        .await
        .expect("register root");
    let mia = engine
        .register("mia", SystemRole::Member)
        .await
        .expect("register mia");
    engine
        .tenancy
        .transfer_or_remove_company(CompanyTransferRequest::transfer(
            root.id(),
            mia.id(),
            acme.company.id(),
        ))
        .await
        .expect("place mia in acme");
    let private = engine
        .tenancy
        .create_board(mia.id(), acme.company.id(), "Mia's notes")
        .await
        .expect("mia creates a board");

    let owner_access = engine
        .tenancy
        .resolver()
        .resolve_effective_role(acme.owner.id(), private.id())
        .await
        .expect("resolve owner access");

    assert_eq!(owner_access, Some(EffectiveRole::CompanyAdminOverride));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn foreign_company_admin_is_refused(engine: Engine) {
    let acme = engine
        .seed_company("olive", "Acme")
        .await
        .expect("seed acme");
    let globex = engine
        .seed_company("gus", "Globex")
        .await
        .expect("seed globex");

    let result = engine
        .tenancy
        .add_board_member(
            globex.owner.id(),
            acme.board.id(),
            globex.owner.id(),
            BoardRole::Viewer,
        )
        .await;

    assert!(matches!(result, Err(TenancyServiceError::Unauthorized { .. })));
}
