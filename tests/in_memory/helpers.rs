//! Shared test helpers for in-memory integration tests.

pub use crate::test_helpers::ManualClock;
use rstest::fixture;
use std::sync::Arc;
use tenantry::{
    invitation::services::InvitationService,
    session::{adapters::memory::InMemorySessionStore, services::SessionContextService},
    tenancy::{
        adapters::memory::InMemoryWorkspaceStore,
        domain::{Board, Company, SystemRole, User},
        services::{RegisterUserRequest, TenancyService, TenancyServiceError},
    },
};

/// Every service wired to one shared in-memory store.
pub struct Engine {
    /// The shared tenancy and invitation store.
    pub store: Arc<InMemoryWorkspaceStore>,
    /// The shared clock.
    pub clock: Arc<ManualClock>,
    /// Tenancy administration.
    pub tenancy: TenancyService<InMemoryWorkspaceStore, ManualClock>,
    /// Invitation lifecycle.
    pub invitations: Arc<InvitationService<InMemoryWorkspaceStore, ManualClock>>,
    /// Session context.
    pub sessions: SessionContextService<InMemoryWorkspaceStore, InMemorySessionStore>,
}

/// Provides a fresh engine for each test.
#[fixture]
pub fn engine() -> Engine {
    let store = Arc::new(InMemoryWorkspaceStore::new());
    let clock = Arc::new(ManualClock::new());
    Engine {
        tenancy: TenancyService::new(Arc::clone(&store), Arc::clone(&clock)),
        invitations: Arc::new(InvitationService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
        )),
        sessions: SessionContextService::new(
            Arc::clone(&store),
            Arc::new(InMemorySessionStore::new()),
        ),
        store,
        clock,
    }
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

impl Engine {
    /// Registers a user named `name` with an `@example.com` address.
    ///
    /// # Errors
    ///
    /// Returns the service error when registration fails.
    pub async fn register(&self, name: &str, role: SystemRole) -> Result<User, TenancyServiceError> {
        self.tenancy
            .register_user(
                RegisterUserRequest::new(name, format!("{name}@example.com")).with_role(role),
            )
            .await
    }

    /// Registers `owner` and creates a company with one board for it.
    ///
    /// # Errors
    ///
    /// Returns the service error when any step fails.
    pub async fn seed_company(
        &self,
        owner: &str,
        company: &str,
    ) -> Result<SeededCompany, TenancyServiceError> {
        let admin = self.register(owner, SystemRole::Member).await?;
        let created = self.tenancy.create_company(admin.id(), company).await?;
        let board = self
            .tenancy
            .create_board(admin.id(), created.id(), "General")
            .await?;
        Ok(SeededCompany {
            owner: admin,
            company: created,
            board,
        })
    }
}
