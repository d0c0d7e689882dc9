//! Shared test helpers for `PostgreSQL` integration tests.
//!
//! Uses `pg-embed-setup-unpriv` for embedded `PostgreSQL` lifecycle management.

use crate::test_helpers::ManualClock;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use pg_embedded_setup_unpriv::TestCluster;
use std::sync::Arc;
use tenantry::{
    invitation::services::InvitationService,
    tenancy::{
        adapters::postgres::PostgresWorkspaceStore,
        domain::{Board, Company, SystemRole, User},
        services::{RegisterUserRequest, TenancyService},
    },
};
use tokio::runtime::Runtime;

/// Boxed error used by the setup helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating the tenancy schema.
pub const CREATE_TENANCY_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_tenancy/up.sql");

/// Template database name for the pre-migrated schema.
pub const TEMPLATE_DB: &str = "tenantry_test_template";

/// Connections per test database; enough for concurrent acceptances.
const POOL_SIZE: u32 = 4;

/// Creates a tokio runtime for async operations in tests.
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema applied.
///
/// # Errors
///
/// Returns an error if template creation or migration fails.
pub fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            conn.batch_execute(CREATE_TENANCY_SQL)
                .map_err(|e| eyre::eyre!("migration failed: {e}"))?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as BoxError)
}

/// Guard that drops the test database even if the test panics.
pub struct CleanupGuard<'a> {
    cluster: &'a TestCluster,
    db_name: String,
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(self.db_name.as_str()) {
            tracing::warn!(db_name = %self.db_name, error = %e, "failed to drop test database");
        }
    }
}

/// Every service wired to one `PostgreSQL` store on a fresh database.
///
/// The guard is declared last so pooled connections close before the
/// database is dropped.
pub struct PgEngine<'a> {
    /// The store under test.
    pub store: Arc<PostgresWorkspaceStore>,
    /// The shared clock.
    pub clock: Arc<ManualClock>,
    /// Tenancy administration.
    pub tenancy: TenancyService<PostgresWorkspaceStore, ManualClock>,
    /// Invitation lifecycle.
    pub invitations: InvitationService<PostgresWorkspaceStore, ManualClock>,
    _guard: CleanupGuard<'a>,
}

/// Creates a database named after `label` from the template and wires the
/// services to it.
///
/// # Errors
///
/// Returns an error if the template, the database, or the pool cannot be
/// created.
pub fn setup_engine<'a>(cluster: &'a TestCluster, label: &str) -> Result<PgEngine<'a>, BoxError> {
    ensure_template(cluster)?;
    let db_name = format!("test_{label}_{}", uuid::Uuid::new_v4().simple());
    cluster
        .create_database_from_template(db_name.as_str(), TEMPLATE_DB)
        .map_err(|e| Box::new(e) as BoxError)?;
    let guard = CleanupGuard {
        cluster,
        db_name: db_name.clone(),
    };
    let url = cluster.connection().database_url(&db_name);
    let pool = Pool::builder()
        .max_size(POOL_SIZE)
        .build(ConnectionManager::<PgConnection>::new(url))
        .map_err(|e| Box::new(e) as BoxError)?;

    let store = Arc::new(PostgresWorkspaceStore::new(pool));
    let clock = Arc::new(ManualClock::new());
    Ok(PgEngine {
        tenancy: TenancyService::new(Arc::clone(&store), Arc::clone(&clock)),
        invitations: InvitationService::new(Arc::clone(&store), Arc::clone(&clock)),
        store,
        clock,
        _guard: guard,
    })
}

/// A company with its owner and one board.
pub struct SeededCompany {
    /// Owner and first company admin.
    pub owner: User,
    /// The company.
    pub company: Company,
    /// A board created by the owner.
    pub board: Board,
}

impl PgEngine<'_> {
    /// Registers a user named `name` with an `@example.com` address.
    pub async fn register(&self, name: &str, role: SystemRole) -> User {
        self.tenancy
            .register_user(
                RegisterUserRequest::new(name, format!("{name}@example.com")).with_role(role),
            )
            .await
            .expect("registration should succeed")
    }

    /// Registers `owner` and creates a company with a "General" board.
    pub async fn seed_company(&self, owner: &str, company: &str) -> SeededCompany {
        let admin = self.register(owner, SystemRole::Member).await;
        let created = self
            .tenancy
            .create_company(admin.id(), company)
            .await
            .expect("company creation should succeed");
        let board = self
            .tenancy
            .create_board(admin.id(), created.id(), "General")
            .await
            .expect("board creation should succeed");
        SeededCompany {
            owner: admin,
            company: created,
            board,
        }
    }
}
