//! Authorization-gated tenancy mutations.

use crate::authz::{
    domain::{Principal, RequiredRoles},
    services::PermissionResolver,
};
use crate::error::{Classified, ErrorKind};
use crate::tenancy::{
    domain::{
        Board, BoardId, BoardMembership, BoardRole, Company, CompanyId, CompanyTransition,
        EmailAddress, SystemRole, TenancyDomainError, User, UserId,
    },
    ports::{TenancyRepository, TenancyRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Request payload for registering a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserRequest {
    username: String,
    email: String,
    role: SystemRole,
}

impl RegisterUserRequest {
    /// Creates a request for a plain member.
    #[must_use]
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            role: SystemRole::Member,
        }
    }

    /// Sets the initial system role.
    ///
    /// `company_admin` is downgraded to `member` because a new user has no
    /// company yet.
    #[must_use]
    pub const fn with_role(mut self, role: SystemRole) -> Self {
        self.role = role;
        self
    }
}

/// Request payload for moving a user between companies or out of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyTransferRequest {
    actor: UserId,
    user: UserId,
    target: Option<CompanyId>,
    grant_admin: bool,
}

impl CompanyTransferRequest {
    /// Moves `user` into `target`.
    #[must_use]
    pub const fn transfer(actor: UserId, user: UserId, target: CompanyId) -> Self {
        Self {
            actor,
            user,
            target: Some(target),
            grant_admin: false,
        }
    }

    /// Removes `user` from its company.
    #[must_use]
    pub const fn remove(actor: UserId, user: UserId) -> Self {
        Self {
            actor,
            user,
            target: None,
            grant_admin: false,
        }
    }

    /// Makes the user `company_admin` of the target company.
    #[must_use]
    pub const fn granting_admin(mut self) -> Self {
        self.grant_admin = true;
        self
    }

    /// Returns the acting user.
    #[must_use]
    pub const fn actor(&self) -> UserId {
        self.actor
    }

    /// Returns the user being moved.
    #[must_use]
    pub const fn user(&self) -> UserId {
        self.user
    }

    /// Returns the destination, `None` for removal.
    #[must_use]
    pub const fn target(&self) -> Option<CompanyId> {
        self.target
    }
}

/// Result of a committed company transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyTransferOutcome {
    /// The applied transition.
    pub transition: CompanyTransition,
    /// Board memberships deleted from the vacated company.
    pub removed_memberships: usize,
}

/// Errors returned by [`TenancyService`].
#[derive(Debug, Error)]
pub enum TenancyServiceError {
    /// Input validation failed.
    #[error(transparent)]
    Domain(#[from] TenancyDomainError),

    /// The acting user does not exist.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(UserId),

    /// The actor lacks the role required for the action.
    #[error("user {user_id} is not allowed to {action}")]
    Unauthorized {
        /// Acting user.
        user_id: UserId,
        /// Refused action.
        action: &'static str,
    },

    /// The target user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The referenced company does not exist.
    #[error("company not found: {0}")]
    CompanyNotFound(CompanyId),

    /// The referenced board does not exist.
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),

    /// A transfer named a company that does not exist.
    #[error("invalid target company: {0}")]
    InvalidCompany(CompanyId),

    /// The user already belongs to a company.
    #[error("user {0} already belongs to a company")]
    AlreadyInCompany(UserId),

    /// The target user belongs to no company.
    #[error("user {0} does not belong to a company")]
    NoCompany(UserId),

    /// The target user is outside the board's company.
    #[error("user {user_id} does not belong to company {company_id}")]
    TargetOutsideCompany {
        /// Target user.
        user_id: UserId,
        /// Required company.
        company_id: CompanyId,
    },

    /// The company owner must stay in the company as its administrator.
    #[error("the owner of company {company_id} cannot be demoted or removed")]
    OwnerProtected {
        /// Protected company.
        company_id: CompanyId,
    },

    /// The board creator must stay on the board as its administrator.
    #[error("the creator of board {board_id} cannot be demoted or removed")]
    CreatorProtected {
        /// Protected board.
        board_id: BoardId,
    },

    /// Administrators cannot remove themselves.
    #[error("user {0} cannot remove themselves")]
    SelfRemoval(UserId),

    /// Platform administrators are managed through the platform role only.
    #[error("user {0} is a platform admin")]
    PlatformAdminTarget(UserId),

    /// Company-scope role changes accept only `company_admin` and `member`.
    #[error("{0} is not a company-scope role")]
    InvalidCompanyRole(SystemRole),

    /// The store refused or failed the operation.
    #[error(transparent)]
    Repository(#[from] TenancyRepositoryError),
}

impl Classified for TenancyServiceError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownPrincipal(_)
            | Self::Unauthorized { .. }
            | Self::PlatformAdminTarget(_) => ErrorKind::Unauthorized,
            Self::UserNotFound(_) | Self::CompanyNotFound(_) | Self::BoardNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::AlreadyInCompany(_) => ErrorKind::Conflict,
            Self::Domain(_)
            | Self::InvalidCompany(_)
            | Self::NoCompany(_)
            | Self::TargetOutsideCompany { .. }
            | Self::OwnerProtected { .. }
            | Self::CreatorProtected { .. }
            | Self::SelfRemoval(_)
            | Self::InvalidCompanyRole(_) => ErrorKind::InvariantViolation,
            Self::Repository(err) => err.kind(),
        }
    }

    fn reason_code(&self) -> &'static str {
        match self {
            Self::Domain(_) => "invalid_input",
            Self::UnknownPrincipal(_) => "unknown_principal",
            Self::Unauthorized { .. } => "unauthorized",
            Self::UserNotFound(_) => "user_not_found",
            Self::CompanyNotFound(_) => "company_not_found",
            Self::BoardNotFound(_) => "board_not_found",
            Self::InvalidCompany(_) => "invalid_company",
            Self::AlreadyInCompany(_) => "already_in_company",
            Self::NoCompany(_) => "no_company",
            Self::TargetOutsideCompany { .. } => "target_outside_company",
            Self::OwnerProtected { .. } => "owner_protected",
            Self::CreatorProtected { .. } => "creator_protected",
            Self::SelfRemoval(_) => "self_removal",
            Self::PlatformAdminTarget(_) => "platform_admin_target",
            Self::InvalidCompanyRole(_) => "invalid_company_role",
            Self::Repository(err) => err.reason_code(),
        }
    }
}

/// Result type for tenancy administration.
pub type TenancyServiceResult<T> = Result<T, TenancyServiceError>;

fn refused(err: TenancyServiceError) -> TenancyServiceError {
    warn!(
        kind = %err.kind(),
        reason = err.reason_code(),
        error = %err,
        "tenancy request refused"
    );
    err
}

/// Logs store refusals such as constraint conflicts; infrastructure
/// failures pass through unlogged.
fn from_store(err: TenancyRepositoryError) -> TenancyServiceError {
    let err = TenancyServiceError::from(err);
    if err.kind().is_fatal() {
        err
    } else {
        refused(err)
    }
}

/// Administration of users, companies, boards, and memberships.
#[derive(Clone)]
pub struct TenancyService<R, C>
where
    R: TenancyRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    resolver: PermissionResolver<R>,
    clock: Arc<C>,
}

impl<R, C> TenancyService<R, C>
where
    R: TenancyRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new administration service.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        let resolver = PermissionResolver::new(Arc::clone(&repository));
        Self {
            repository,
            resolver,
            clock,
        }
    }

    /// Returns the resolver used for authorization decisions.
    #[must_use]
    pub const fn resolver(&self) -> &PermissionResolver<R> {
        &self.resolver
    }

    /// Registers a new user without a company.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyServiceError::Domain`] for an invalid username or
    /// email and a repository conflict when the email is taken.
    pub async fn register_user(&self, request: RegisterUserRequest) -> TenancyServiceResult<User> {
        let email = EmailAddress::new(request.email)?;
        let user = User::register(request.username, email, request.role, &*self.clock)?;
        self.repository
            .insert_user(&user)
            .await
            .map_err(from_store)?;
        info!(user_id = %user.id(), role = %user.role(), "registered user");
        Ok(user)
    }

    /// Creates a company owned by `actor`.
    ///
    /// A user without a company becomes its owner and `company_admin`. A
    /// platform admin may create any number of companies and keeps its role.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyServiceError::AlreadyInCompany`] when a non-platform
    /// actor already belongs to a company.
    pub async fn create_company(
        &self,
        actor: UserId,
        name: impl Into<String>,
    ) -> TenancyServiceResult<Company> {
        let owner = self.load_actor(actor).await?;
        if !owner.is_platform_admin() && owner.company_id().is_some() {
            return Err(refused(TenancyServiceError::AlreadyInCompany(actor)));
        }

        let company = Company::new(name, actor, &*self.clock)?;
        let transition = (!owner.is_platform_admin())
            .then(|| CompanyTransition::plan(&owner, Some(company.id()), true, &*self.clock));
        self.repository
            .create_company(&company, transition.as_ref())
            .await?;
        info!(company_id = %company.id(), owner = %actor, "created company");
        Ok(company)
    }

    /// Creates a board in `company_id`.
    ///
    /// The creator receives `board_admin`, unless it is a platform admin
    /// outside the company, which the platform override already covers.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyServiceError::Unauthorized`] when the actor neither
    /// belongs to the company nor is a platform admin.
    pub async fn create_board(
        &self,
        actor: UserId,
        company_id: CompanyId,
        name: impl Into<String>,
    ) -> TenancyServiceResult<Board> {
        let creator = self.load_actor(actor).await?;
        if self.repository.find_company(company_id).await?.is_none() {
            return Err(refused(TenancyServiceError::CompanyNotFound(company_id)));
        }
        if !creator.is_platform_admin() && !creator.belongs_to(company_id) {
            return Err(refused(TenancyServiceError::Unauthorized {
                user_id: actor,
                action: "create boards in this company",
            }));
        }

        let board = Board::new(company_id, name, actor, &*self.clock)?;
        let membership = creator
            .belongs_to(company_id)
            .then(|| BoardMembership::grant(board.id(), actor, BoardRole::Admin, &*self.clock));
        self.repository
            .create_board(&board, membership.as_ref())
            .await?;
        info!(board_id = %board.id(), company_id = %company_id, creator = %actor, "created board");
        Ok(board)
    }

    /// Grants `user_id` an explicit role on `board_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyServiceError::Unauthorized`] unless the actor holds
    /// `board_admin` (or an override) and
    /// [`TenancyServiceError::TargetOutsideCompany`] when the user is not in
    /// the board's company.
    pub async fn add_board_member(
        &self,
        actor: UserId,
        board_id: BoardId,
        user_id: UserId,
        role: BoardRole,
    ) -> TenancyServiceResult<BoardMembership> {
        let board = self.load_board(board_id).await?;
        self.require_board(actor, &board, "manage board members")
            .await?;
        let target = self.load_user(user_id).await?;
        if !target.belongs_to(board.company_id()) {
            return Err(refused(TenancyServiceError::TargetOutsideCompany {
                user_id,
                company_id: board.company_id(),
            }));
        }

        let membership = BoardMembership::grant(board_id, user_id, role, &*self.clock);
        self.repository
            .insert_membership(&membership)
            .await
            .map_err(from_store)?;
        info!(board_id = %board_id, user_id = %user_id, role = %role, "added board member");
        Ok(membership)
    }

    /// Changes the explicit role of an existing member.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyServiceError::CreatorProtected`] when the board
    /// creator tries to demote itself below `board_admin`.
    pub async fn change_board_role(
        &self,
        actor: UserId,
        board_id: BoardId,
        user_id: UserId,
        role: BoardRole,
    ) -> TenancyServiceResult<BoardMembership> {
        let board = self.load_board(board_id).await?;
        self.require_board(actor, &board, "manage board members")
            .await?;
        let mut membership = self
            .repository
            .find_membership(board_id, user_id)
            .await?
            .ok_or(TenancyRepositoryError::MembershipNotFound { board_id, user_id })?;
        if user_id == actor && user_id == board.created_by() && role != BoardRole::Admin {
            return Err(refused(TenancyServiceError::CreatorProtected { board_id }));
        }

        membership.change_role(role, self.clock.utc());
        self.repository.update_membership(&membership).await?;
        info!(board_id = %board_id, user_id = %user_id, role = %role, "changed board role");
        Ok(membership)
    }

    /// Removes an explicit membership.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyServiceError::SelfRemoval`] when the actor targets
    /// itself and [`TenancyServiceError::CreatorProtected`] for the board
    /// creator.
    pub async fn remove_board_member(
        &self,
        actor: UserId,
        board_id: BoardId,
        user_id: UserId,
    ) -> TenancyServiceResult<()> {
        let board = self.load_board(board_id).await?;
        self.require_board(actor, &board, "manage board members")
            .await?;
        if user_id == actor {
            return Err(refused(TenancyServiceError::SelfRemoval(actor)));
        }
        if user_id == board.created_by() {
            return Err(refused(TenancyServiceError::CreatorProtected { board_id }));
        }

        self.repository.remove_membership(board_id, user_id).await?;
        info!(board_id = %board_id, user_id = %user_id, "removed board member");
        Ok(())
    }

    /// Promotes a user to `company_admin` of its company or demotes it to
    /// `member`.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyServiceError::Unauthorized`] unless the actor
    /// administers the target's company,
    /// [`TenancyServiceError::OwnerProtected`] when the owner demotes
    /// itself, and a repository invariant violation when the company would
    /// lose its last administrator.
    pub async fn change_company_role(
        &self,
        actor: UserId,
        user_id: UserId,
        role: SystemRole,
    ) -> TenancyServiceResult<User> {
        if role.is_platform_admin() {
            return Err(refused(TenancyServiceError::InvalidCompanyRole(role)));
        }
        let principal = self.load_principal(actor).await?;
        let target = self.load_user(user_id).await?;
        let Some(company_id) = target.company_id() else {
            return Err(refused(TenancyServiceError::NoCompany(user_id)));
        };
        if !principal.can_administer(company_id) {
            return Err(refused(TenancyServiceError::Unauthorized {
                user_id: actor,
                action: "change company roles",
            }));
        }
        if target.is_platform_admin() {
            return Err(refused(TenancyServiceError::PlatformAdminTarget(user_id)));
        }
        let company = self
            .repository
            .find_company(company_id)
            .await?
            .ok_or(TenancyServiceError::CompanyNotFound(company_id))?;
        if actor == user_id && company.owner() == user_id && !role.is_company_admin() {
            return Err(refused(TenancyServiceError::OwnerProtected { company_id }));
        }

        self.set_role(user_id, role).await
    }

    /// Sets any system role. Platform admins only.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyServiceError::Unauthorized`] for non-platform actors
    /// and a repository invariant violation when the last platform admin
    /// would be demoted.
    pub async fn change_platform_role(
        &self,
        actor: UserId,
        user_id: UserId,
        role: SystemRole,
    ) -> TenancyServiceResult<User> {
        let principal = self.load_principal(actor).await?;
        if !principal.is_platform_admin() {
            return Err(refused(TenancyServiceError::Unauthorized {
                user_id: actor,
                action: "change platform roles",
            }));
        }
        self.load_user(user_id).await?;
        self.set_role(user_id, role).await
    }

    /// Moves a user into another company or removes it from its company.
    ///
    /// Platform admins may move anyone anywhere. Company admins may only
    /// remove members of their own company, never themselves and never the
    /// owner. Memberships on the vacated company's boards are deleted in the
    /// same atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyServiceError::InvalidCompany`] for an unknown target
    /// and [`TenancyServiceError::Unauthorized`] when the actor may not
    /// perform the move.
    pub async fn transfer_or_remove_company(
        &self,
        request: CompanyTransferRequest,
    ) -> TenancyServiceResult<CompanyTransferOutcome> {
        let principal = self.load_principal(request.actor).await?;
        let user = self.load_user(request.user).await?;

        if principal.is_platform_admin() {
            if let Some(target) = request.target
                && self.repository.find_company(target).await?.is_none()
            {
                return Err(refused(TenancyServiceError::InvalidCompany(target)));
            }
        } else {
            self.check_company_removal(&principal, &user, request)
                .await?;
        }

        let transition =
            CompanyTransition::plan(&user, request.target, request.grant_admin, &*self.clock);
        debug!(
            user_id = %user.id(),
            from = ?transition.from(),
            to = ?transition.to(),
            role = %transition.role(),
            "planned company transition"
        );
        let removed_memberships = self
            .repository
            .apply_company_transition(&transition)
            .await
            .map_err(from_store)?;
        info!(
            user_id = %user.id(),
            from = ?transition.from(),
            to = ?transition.to(),
            removed_memberships,
            "applied company transition"
        );
        Ok(CompanyTransferOutcome {
            transition,
            removed_memberships,
        })
    }

    async fn check_company_removal(
        &self,
        principal: &Principal,
        user: &User,
        request: CompanyTransferRequest,
    ) -> TenancyServiceResult<()> {
        let own_company = principal
            .company_id()
            .filter(|company_id| principal.can_administer(*company_id));
        let Some(company_id) = own_company else {
            return Err(refused(TenancyServiceError::Unauthorized {
                user_id: principal.user_id(),
                action: "move users between companies",
            }));
        };
        if request.target.is_some() || !user.belongs_to(company_id) {
            return Err(refused(TenancyServiceError::Unauthorized {
                user_id: principal.user_id(),
                action: "move users outside their company",
            }));
        }
        if user.id() == principal.user_id() {
            return Err(refused(TenancyServiceError::SelfRemoval(user.id())));
        }
        let company = self
            .repository
            .find_company(company_id)
            .await?
            .ok_or(TenancyServiceError::CompanyNotFound(company_id))?;
        if company.owner() == user.id() {
            return Err(refused(TenancyServiceError::OwnerProtected { company_id }));
        }
        Ok(())
    }

    async fn set_role(&self, user_id: UserId, role: SystemRole) -> TenancyServiceResult<User> {
        self.repository
            .set_system_role(user_id, role, self.clock.utc())
            .await
            .map_err(from_store)?;
        let updated = self.load_user(user_id).await?;
        info!(user_id = %user_id, role = %role, "changed system role");
        Ok(updated)
    }

    async fn require_board(
        &self,
        actor: UserId,
        board: &Board,
        action: &'static str,
    ) -> TenancyServiceResult<()> {
        let principal = self.load_principal(actor).await?;
        if !self
            .resolver
            .permits(&principal, board.id(), &RequiredRoles::ADMINS)
            .await?
        {
            return Err(refused(TenancyServiceError::Unauthorized {
                user_id: actor,
                action,
            }));
        }
        Ok(())
    }

    async fn load_actor(&self, actor: UserId) -> TenancyServiceResult<User> {
        self.repository
            .find_user(actor)
            .await?
            .ok_or_else(|| refused(TenancyServiceError::UnknownPrincipal(actor)))
    }

    async fn load_principal(&self, actor: UserId) -> TenancyServiceResult<Principal> {
        self.resolver
            .principal(actor)
            .await?
            .ok_or_else(|| refused(TenancyServiceError::UnknownPrincipal(actor)))
    }

    async fn load_user(&self, user_id: UserId) -> TenancyServiceResult<User> {
        self.repository
            .find_user(user_id)
            .await?
            .ok_or(TenancyServiceError::UserNotFound(user_id))
    }

    async fn load_board(&self, board_id: BoardId) -> TenancyServiceResult<Board> {
        self.repository
            .find_board(board_id)
            .await?
            .ok_or(TenancyServiceError::BoardNotFound(board_id))
    }
}
