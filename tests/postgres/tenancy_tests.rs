//! Tenancy graph invariants against the `PostgreSQL` store.

use super::helpers::{setup_engine, test_runtime};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use tenantry::{
    authz::domain::EffectiveRole,
    error::{Classified, ErrorKind},
    tenancy::{
        domain::{BoardRole, SystemRole},
        ports::{TenancyRepository, TenancyRepositoryError},
        services::{CompanyTransferRequest, RegisterUserRequest, TenancyServiceError},
    },
};

#[rstest]
fn transfer_purges_memberships_of_the_old_company(shared_test_cluster: &'static TestCluster) {
    let engine = setup_engine(shared_test_cluster, "purge").expect("engine setup");
    let rt = test_runtime();

    rt.block_on(async {
        let acme = engine.seed_company("olive", "Acme").await;
        let globex = engine.seed_company("gus", "Globex").await;
        let root = engine.register("root", SystemRole::PlatformAdmin).await;
        let mia = engine.register("mia", SystemRole::Member).await;
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
            .add_board_member(acme.owner.id(), acme.board.id(), mia.id(), BoardRole::Editor)
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
        let moved = engine
            .store
            .find_user(mia.id())
            .await
            .expect("lookup user")
            .expect("user exists");
        assert_eq!(moved.company_id(), Some(globex.company.id()));
        assert_eq!(moved.role(), SystemRole::Member);
    });
}

#[rstest]
fn last_platform_admin_cannot_be_demoted(shared_test_cluster: &'static TestCluster) {
    let engine = setup_engine(shared_test_cluster, "last_pa").expect("engine setup");
    let rt = test_runtime();

    rt.block_on(async {
        let root = engine.register("root", SystemRole::PlatformAdmin).await;

        let result = engine
            .tenancy
            .change_platform_role(root.id(), root.id(), SystemRole::Member)
            .await;

        let err = result.expect_err("last platform admin stays");
        assert!(matches!(
            err,
            TenancyServiceError::Repository(TenancyRepositoryError::LastPlatformAdmin(id))
                if id == root.id()
        ));
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        let unchanged = engine
            .store
            .find_user(root.id())
            .await
            .expect("lookup user")
            .expect("user exists");
        assert_eq!(unchanged.role(), SystemRole::PlatformAdmin);
    });
}

#[rstest]
fn last_company_admin_cannot_leave_or_be_demoted(shared_test_cluster: &'static TestCluster) {
    let engine = setup_engine(shared_test_cluster, "last_ca").expect("engine setup");
    let rt = test_runtime();

    rt.block_on(async {
        let acme = engine.seed_company("olive", "Acme").await;
        let root = engine.register("root", SystemRole::PlatformAdmin).await;

        let removal = engine
            .tenancy
            .transfer_or_remove_company(CompanyTransferRequest::remove(root.id(), acme.owner.id()))
            .await;
        let demotion = engine
            .tenancy
            .change_platform_role(root.id(), acme.owner.id(), SystemRole::Member)
            .await;

        for result in [removal.map(|_| ()), demotion.map(|_| ())] {
            assert!(matches!(
                result,
                Err(TenancyServiceError::Repository(
                    TenancyRepositoryError::LastCompanyAdmin(company)
                )) if company == acme.company.id()
            ));
        }
        let owner = engine
            .store
            .find_user(acme.owner.id())
            .await
            .expect("lookup user")
            .expect("user exists");
        assert_eq!(owner.company_id(), Some(acme.company.id()));
        assert_eq!(owner.role(), SystemRole::CompanyAdmin);
        let access = engine
            .tenancy
            .resolver()
            .resolve_effective_role(acme.owner.id(), acme.board.id())
            .await
            .expect("resolve role");
        assert_eq!(access, Some(EffectiveRole::CompanyAdminOverride));
    });
}

#[rstest]
fn duplicate_email_is_refused_by_the_unique_index(shared_test_cluster: &'static TestCluster) {
    let engine = setup_engine(shared_test_cluster, "dup_email").expect("engine setup");
    let rt = test_runtime();

    rt.block_on(async {
        engine.register("olive", SystemRole::Member).await;

        let result = engine
            .tenancy
            .register_user(RegisterUserRequest::new("olive2", "olive@example.com"))
            .await;

        assert!(matches!(
            result,
            Err(TenancyServiceError::Repository(TenancyRepositoryError::DuplicateEmail(_)))
        ));
    });
}

#[rstest]
fn company_boards_are_listed_by_name(shared_test_cluster: &'static TestCluster) {
    let engine = setup_engine(shared_test_cluster, "boards").expect("engine setup");
    let rt = test_runtime();

    rt.block_on(async {
        let acme = engine.seed_company("olive", "Acme").await;
        let globex = engine.seed_company("gus", "Globex").await;
        for name in ["Roadmap", "Backlog"] {
            engine
                .tenancy
                .create_board(acme.owner.id(), acme.company.id(), name)
                .await
                .expect("board creation should succeed");
        }

        let boards = engine
            .store
            .list_boards_for_company(acme.company.id())
            .await
            .expect("list boards");
        let accessible = engine
            .tenancy
            .resolver()
            .accessible_boards(acme.owner.id(), None)
            .await
            .expect("list accessible boards");
        let outsider = engine
            .tenancy
            .resolver()
            .accessible_boards(globex.owner.id(), Some(acme.company.id()))
            .await
            .expect("list accessible boards");

        let names: Vec<_> = boards.iter().map(|board| board.name().to_owned()).collect();
        assert_eq!(names, ["Backlog", "General", "Roadmap"]);
        assert_eq!(accessible.len(), 3);
        assert!(
            accessible
                .iter()
                .all(|entry| entry.access() == EffectiveRole::CompanyAdminOverride)
        );
        assert!(outsider.is_empty());
    });
}
