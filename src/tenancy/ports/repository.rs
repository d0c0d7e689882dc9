//! Repository port for the tenancy entity graph.
//!
//! Every operation that touches more than one row is defined here as a single
//! call so that adapters can apply it atomically. Invariants that depend on
//! the state of other rows (last platform admin, last company admin,
//! cross-tenant memberships) are checked inside the same atomic unit as the
//! write they guard.

use crate::error::{Classified, ErrorKind};
use crate::tenancy::domain::{
    Board, BoardId, BoardMembership, Company, CompanyId, CompanyTransition, EmailAddress,
    SystemRole, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for tenancy repository operations.
pub type TenancyRepositoryResult<T> = Result<T, TenancyRepositoryError>;

/// Tenancy persistence contract.
#[async_trait]
pub trait TenancyRepository: Send + Sync {
    /// Stores a newly registered user.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyRepositoryError::DuplicateUser`] or
    /// [`TenancyRepositoryError::DuplicateEmail`] on collisions.
    async fn insert_user(&self, user: &User) -> TenancyRepositoryResult<()>;

    /// Finds a user by identifier.
    async fn find_user(&self, id: UserId) -> TenancyRepositoryResult<Option<User>>;

    /// Finds a user by normalised email address.
    async fn find_user_by_email(
        &self,
        email: &EmailAddress,
    ) -> TenancyRepositoryResult<Option<User>>;

    /// Finds a company by identifier.
    async fn find_company(&self, id: CompanyId) -> TenancyRepositoryResult<Option<Company>>;

    /// Finds a board by identifier.
    async fn find_board(&self, id: BoardId) -> TenancyRepositoryResult<Option<Board>>;

    /// Finds the explicit membership of `user_id` on `board_id`.
    async fn find_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> TenancyRepositoryResult<Option<BoardMembership>>;

    /// Lists every explicit membership held by `user_id`.
    async fn list_memberships_for_user(
        &self,
        user_id: UserId,
    ) -> TenancyRepositoryResult<Vec<BoardMembership>>;

    /// Lists the boards of `company_id`, ordered by name.
    async fn list_boards_for_company(
        &self,
        company_id: CompanyId,
    ) -> TenancyRepositoryResult<Vec<Board>>;

    /// Stores a company and, when given, moves its owner into it.
    ///
    /// Both writes happen atomically; a failing owner transition leaves no
    /// company behind.
    ///
    /// # Errors
    ///
    /// Returns any error of [`TenancyRepository::apply_company_transition`].
    async fn create_company(
        &self,
        company: &Company,
        owner_transition: Option<&CompanyTransition>,
    ) -> TenancyRepositoryResult<()>;

    /// Stores a board together with its creator's membership, when given.
    ///
    /// A platform admin creating a board in a company it does not belong to
    /// gets no membership row; the platform override already covers it.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyRepositoryError::CompanyNotFound`] when the board's
    /// company is missing, or the errors of
    /// [`TenancyRepository::insert_membership`] for the creator row.
    async fn create_board(
        &self,
        board: &Board,
        creator: Option<&BoardMembership>,
    ) -> TenancyRepositoryResult<()>;

    /// Stores an explicit board membership.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyRepositoryError::CrossTenantMembership`] when the
    /// user is not in the board's company (platform admins included) and
    /// [`TenancyRepositoryError::DuplicateMembership`] when a row already
    /// exists.
    async fn insert_membership(&self, membership: &BoardMembership) -> TenancyRepositoryResult<()>;

    /// Replaces the role of an existing membership.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyRepositoryError::MembershipNotFound`] when no row
    /// exists for the pair.
    async fn update_membership(&self, membership: &BoardMembership) -> TenancyRepositoryResult<()>;

    /// Deletes an explicit membership.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyRepositoryError::MembershipNotFound`] when no row
    /// exists for the pair.
    async fn remove_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> TenancyRepositoryResult<()>;

    /// Changes a user's system role without moving them.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyRepositoryError::LastPlatformAdmin`],
    /// [`TenancyRepositoryError::LastCompanyAdmin`], or
    /// [`TenancyRepositoryError::CompanyAdminWithoutCompany`] when the change
    /// would break an invariant.
    async fn set_system_role(
        &self,
        user_id: UserId,
        role: SystemRole,
        at: DateTime<Utc>,
    ) -> TenancyRepositoryResult<()>;

    /// Applies a planned company transition atomically: purges memberships
    /// on the vacated company's boards and writes the new placement.
    ///
    /// Returns the number of memberships removed.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyRepositoryError::StaleCompany`] when the user's
    /// company no longer matches the plan,
    /// [`TenancyRepositoryError::CompanyNotFound`] for a missing destination,
    /// and [`TenancyRepositoryError::LastCompanyAdmin`] when the vacated
    /// company would lose its last administrator.
    async fn apply_company_transition(
        &self,
        transition: &CompanyTransition,
    ) -> TenancyRepositoryResult<usize>;
}

/// Errors returned by tenancy repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TenancyRepositoryError {
    /// A user with the same identifier already exists.
    #[error("duplicate user identifier: {0}")]
    DuplicateUser(UserId),

    /// A user with the same email address already exists.
    #[error("email address already registered: {0}")]
    DuplicateEmail(EmailAddress),

    /// A company with the same identifier already exists.
    #[error("duplicate company identifier: {0}")]
    DuplicateCompany(CompanyId),

    /// A board with the same identifier already exists.
    #[error("duplicate board identifier: {0}")]
    DuplicateBoard(BoardId),

    /// The user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The company does not exist.
    #[error("company not found: {0}")]
    CompanyNotFound(CompanyId),

    /// The board does not exist.
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),

    /// The user already holds a membership on the board.
    #[error("user {user_id} is already a member of board {board_id}")]
    DuplicateMembership {
        /// Board of the existing row.
        board_id: BoardId,
        /// User of the existing row.
        user_id: UserId,
    },

    /// The user holds no membership on the board.
    #[error("user {user_id} is not a member of board {board_id}")]
    MembershipNotFound {
        /// Requested board.
        board_id: BoardId,
        /// Requested user.
        user_id: UserId,
    },

    /// The membership would link a user to another company's board.
    #[error("user {user_id} does not belong to the company of board {board_id}")]
    CrossTenantMembership {
        /// Target board.
        board_id: BoardId,
        /// Target user.
        user_id: UserId,
    },

    /// The change would leave the platform without a platform admin.
    #[error("user {0} is the last platform admin")]
    LastPlatformAdmin(UserId),

    /// The change would leave the company without a company admin.
    #[error("company {0} would be left without a company admin")]
    LastCompanyAdmin(CompanyId),

    /// `company_admin` was requested for a user without a company.
    #[error("user {0} has no company to administer")]
    CompanyAdminWithoutCompany(UserId),

    /// The user's company changed after the transition was planned.
    #[error("company placement of user {0} changed concurrently")]
    StaleCompany(UserId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TenancyRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

impl Classified for TenancyRepositoryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateUser(_)
            | Self::DuplicateEmail(_)
            | Self::DuplicateCompany(_)
            | Self::DuplicateBoard(_)
            | Self::DuplicateMembership { .. }
            | Self::StaleCompany(_) => ErrorKind::Conflict,
            Self::UserNotFound(_)
            | Self::CompanyNotFound(_)
            | Self::BoardNotFound(_)
            | Self::MembershipNotFound { .. } => ErrorKind::NotFound,
            Self::CrossTenantMembership { .. }
            | Self::LastPlatformAdmin(_)
            | Self::LastCompanyAdmin(_)
            | Self::CompanyAdminWithoutCompany(_) => ErrorKind::InvariantViolation,
            Self::Persistence(_) => ErrorKind::Infrastructure,
        }
    }

    fn reason_code(&self) -> &'static str {
        match self {
            Self::DuplicateUser(_) => "duplicate_user",
            Self::DuplicateEmail(_) => "duplicate_email",
            Self::DuplicateCompany(_) => "duplicate_company",
            Self::DuplicateBoard(_) => "duplicate_board",
            Self::UserNotFound(_) => "user_not_found",
            Self::CompanyNotFound(_) => "company_not_found",
            Self::BoardNotFound(_) => "board_not_found",
            Self::DuplicateMembership { .. } => "duplicate_membership",
            Self::MembershipNotFound { .. } => "membership_not_found",
            Self::CrossTenantMembership { .. } => "cross_tenant_membership",
            Self::LastPlatformAdmin(_) => "last_platform_admin",
            Self::LastCompanyAdmin(_) => "last_company_admin",
            Self::CompanyAdminWithoutCompany(_) => "company_admin_without_company",
            Self::StaleCompany(_) => "stale_company",
            Self::Persistence(_) => "persistence",
        }
    }
}
