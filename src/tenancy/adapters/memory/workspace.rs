//! In-memory tenancy store.
//!
//! Users, companies, boards, memberships, and invitations live behind one
//! lock so that cross-aggregate operations (company transitions, invitation
//! acceptance) are applied as a single atomic unit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::invitation::domain::{Invitation, InvitationId, TokenDigest};
use crate::tenancy::{
    domain::{
        Board, BoardId, BoardMembership, Company, CompanyId, CompanyTransition, EmailAddress,
        SystemRole, User, UserId,
    },
    ports::{TenancyRepository, TenancyRepositoryError, TenancyRepositoryResult},
};

/// Thread-safe in-memory store for the whole tenancy graph.
///
/// Implements both [`TenancyRepository`] and
/// [`InvitationRepository`](crate::invitation::ports::InvitationRepository).
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkspaceStore {
    state: Arc<RwLock<WorkspaceState>>,
}

#[derive(Debug, Default)]
pub(crate) struct WorkspaceState {
    users: HashMap<UserId, User>,
    email_index: HashMap<EmailAddress, UserId>,
    companies: HashMap<CompanyId, Company>,
    boards: HashMap<BoardId, Board>,
    memberships: HashMap<(BoardId, UserId), BoardMembership>,
    pub(crate) invitations: HashMap<InvitationId, Invitation>,
    pub(crate) token_index: HashMap<TokenDigest, InvitationId>,
}

impl InMemoryWorkspaceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read_state(
        &self,
    ) -> Result<RwLockReadGuard<'_, WorkspaceState>, std::io::Error> {
        self.state
            .read()
            .map_err(|err| std::io::Error::other(err.to_string()))
    }

    pub(crate) fn write_state(
        &self,
    ) -> Result<RwLockWriteGuard<'_, WorkspaceState>, std::io::Error> {
        self.state
            .write()
            .map_err(|err| std::io::Error::other(err.to_string()))
    }
}

impl WorkspaceState {
    fn company_admin_count(&self, company_id: CompanyId) -> usize {
        self.users
            .values()
            .filter(|user| user.administers(company_id))
            .count()
    }

    fn platform_admin_count(&self) -> usize {
        self.users
            .values()
            .filter(|user| user.is_platform_admin())
            .count()
    }

    fn purge_memberships(&mut self, user_id: UserId, company_id: CompanyId) -> usize {
        let boards = &self.boards;
        let before = self.memberships.len();
        self.memberships.retain(|(board_id, member), _| {
            *member != user_id
                || boards
                    .get(board_id)
                    .is_none_or(|board| board.company_id() != company_id)
        });
        before - self.memberships.len()
    }

    /// Checks and applies a company transition in place.
    pub(crate) fn apply_transition(
        &mut self,
        transition: &CompanyTransition,
    ) -> TenancyRepositoryResult<usize> {
        let user_id = transition.user_id();
        let current = self
            .users
            .get(&user_id)
            .ok_or(TenancyRepositoryError::UserNotFound(user_id))?;
        if current.company_id() != transition.from() {
            return Err(TenancyRepositoryError::StaleCompany(user_id));
        }
        if let Some(target) = transition.to()
            && !self.companies.contains_key(&target)
        {
            return Err(TenancyRepositoryError::CompanyNotFound(target));
        }
        if let Some(vacated) = transition.relinquished_administration()
            && self.company_admin_count(vacated) <= 1
        {
            return Err(TenancyRepositoryError::LastCompanyAdmin(vacated));
        }

        let removed = transition
            .vacated_company()
            .map_or(0, |company_id| self.purge_memberships(user_id, company_id));
        if let Some(user) = self.users.get_mut(&user_id) {
            user.place(transition.to(), transition.role(), transition.at());
        }
        Ok(removed)
    }
}

fn lock_error(err: std::io::Error) -> TenancyRepositoryError {
    TenancyRepositoryError::persistence(err)
}

#[async_trait]
impl TenancyRepository for InMemoryWorkspaceStore {
    async fn insert_user(&self, user: &User) -> TenancyRepositoryResult<()> {
        let mut state = self.write_state().map_err(lock_error)?;
        if state.users.contains_key(&user.id()) {
            return Err(TenancyRepositoryError::DuplicateUser(user.id()));
        }
        if state.email_index.contains_key(user.email()) {
            return Err(TenancyRepositoryError::DuplicateEmail(user.email().clone()));
        }
        state.email_index.insert(user.email().clone(), user.id());
        state.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> TenancyRepositoryResult<Option<User>> {
        let state = self.read_state().map_err(lock_error)?;
        Ok(state.users.get(&id).cloned())
    }

    async fn find_user_by_email(
        &self,
        email: &EmailAddress,
    ) -> TenancyRepositoryResult<Option<User>> {
        let state = self.read_state().map_err(lock_error)?;
        let user = state
            .email_index
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned();
        Ok(user)
    }

    async fn find_company(&self, id: CompanyId) -> TenancyRepositoryResult<Option<Company>> {
        let state = self.read_state().map_err(lock_error)?;
        Ok(state.companies.get(&id).cloned())
    }

    async fn find_board(&self, id: BoardId) -> TenancyRepositoryResult<Option<Board>> {
        let state = self.read_state().map_err(lock_error)?;
        Ok(state.boards.get(&id).cloned())
    }

    async fn find_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> TenancyRepositoryResult<Option<BoardMembership>> {
        let state = self.read_state().map_err(lock_error)?;
        Ok(state.memberships.get(&(board_id, user_id)).cloned())
    }

    async fn list_memberships_for_user(
        &self,
        user_id: UserId,
    ) -> TenancyRepositoryResult<Vec<BoardMembership>> {
        let state = self.read_state().map_err(lock_error)?;
        let mut memberships: Vec<BoardMembership> = state
            .memberships
            .values()
            .filter(|membership| membership.user_id() == user_id)
            .cloned()
            .collect();
        memberships.sort_by_key(BoardMembership::granted_at);
        Ok(memberships)
    }

    async fn list_boards_for_company(
        &self,
        company_id: CompanyId,
    ) -> TenancyRepositoryResult<Vec<Board>> {
        let state = self.read_state().map_err(lock_error)?;
        let mut boards: Vec<Board> = state
            .boards
            .values()
            .filter(|board| board.company_id() == company_id)
            .cloned()
            .collect();
        boards.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(boards)
    }

    async fn create_company(
        &self,
        company: &Company,
        owner_transition: Option<&CompanyTransition>,
    ) -> TenancyRepositoryResult<()> {
        let mut state = self.write_state().map_err(lock_error)?;
        if state.companies.contains_key(&company.id()) {
            return Err(TenancyRepositoryError::DuplicateCompany(company.id()));
        }
        if !state.users.contains_key(&company.owner()) {
            return Err(TenancyRepositoryError::UserNotFound(company.owner()));
        }
        state.companies.insert(company.id(), company.clone());
        if let Some(transition) = owner_transition
            && let Err(err) = state.apply_transition(transition)
        {
            state.companies.remove(&company.id());
            return Err(err);
        }
        Ok(())
    }

    async fn create_board(
        &self,
        board: &Board,
        creator: Option<&BoardMembership>,
    ) -> TenancyRepositoryResult<()> {
        let mut state = self.write_state().map_err(lock_error)?;
        if state.boards.contains_key(&board.id()) {
            return Err(TenancyRepositoryError::DuplicateBoard(board.id()));
        }
        if !state.companies.contains_key(&board.company_id()) {
            return Err(TenancyRepositoryError::CompanyNotFound(board.company_id()));
        }
        if let Some(membership) = creator {
            let creator_user = state
                .users
                .get(&membership.user_id())
                .ok_or(TenancyRepositoryError::UserNotFound(membership.user_id()))?;
            if !creator_user.belongs_to(board.company_id()) {
                return Err(TenancyRepositoryError::CrossTenantMembership {
                    board_id: board.id(),
                    user_id: membership.user_id(),
                });
            }
        }
        state.boards.insert(board.id(), board.clone());
        if let Some(membership) = creator {
            state
                .memberships
                .insert((board.id(), membership.user_id()), membership.clone());
        }
        Ok(())
    }

    async fn insert_membership(&self, membership: &BoardMembership) -> TenancyRepositoryResult<()> {
        let mut state = self.write_state().map_err(lock_error)?;
        let board_id = membership.board_id();
        let user_id = membership.user_id();
        let board = state
            .boards
            .get(&board_id)
            .ok_or(TenancyRepositoryError::BoardNotFound(board_id))?;
        let user = state
            .users
            .get(&user_id)
            .ok_or(TenancyRepositoryError::UserNotFound(user_id))?;
        if !user.belongs_to(board.company_id()) {
            return Err(TenancyRepositoryError::CrossTenantMembership { board_id, user_id });
        }
        if state.memberships.contains_key(&(board_id, user_id)) {
            return Err(TenancyRepositoryError::DuplicateMembership { board_id, user_id });
        }
        state
            .memberships
            .insert((board_id, user_id), membership.clone());
        Ok(())
    }

    async fn update_membership(&self, membership: &BoardMembership) -> TenancyRepositoryResult<()> {
        let mut state = self.write_state().map_err(lock_error)?;
        let key = (membership.board_id(), membership.user_id());
        let slot = state
            .memberships
            .get_mut(&key)
            .ok_or(TenancyRepositoryError::MembershipNotFound {
                board_id: key.0,
                user_id: key.1,
            })?;
        *slot = membership.clone();
        Ok(())
    }

    async fn remove_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> TenancyRepositoryResult<()> {
        let mut state = self.write_state().map_err(lock_error)?;
        state
            .memberships
            .remove(&(board_id, user_id))
            .map(|_| ())
            .ok_or(TenancyRepositoryError::MembershipNotFound { board_id, user_id })
    }

    async fn set_system_role(
        &self,
        user_id: UserId,
        role: SystemRole,
        at: DateTime<Utc>,
    ) -> TenancyRepositoryResult<()> {
        let mut state = self.write_state().map_err(lock_error)?;
        let user = state
            .users
            .get(&user_id)
            .ok_or(TenancyRepositoryError::UserNotFound(user_id))?;
        let current = user.role();
        let company_id = user.company_id();

        if role.is_company_admin() && company_id.is_none() {
            return Err(TenancyRepositoryError::CompanyAdminWithoutCompany(user_id));
        }
        if current.is_platform_admin()
            && !role.is_platform_admin()
            && state.platform_admin_count() <= 1
        {
            return Err(TenancyRepositoryError::LastPlatformAdmin(user_id));
        }
        if let Some(company) = company_id
            && current.is_company_admin()
            && !role.is_company_admin()
            && state.company_admin_count(company) <= 1
        {
            return Err(TenancyRepositoryError::LastCompanyAdmin(company));
        }

        if let Some(user) = state.users.get_mut(&user_id) {
            user.place(company_id, role, at);
        }
        Ok(())
    }

    async fn apply_company_transition(
        &self,
        transition: &CompanyTransition,
    ) -> TenancyRepositoryResult<usize> {
        let mut state = self.write_state().map_err(lock_error)?;
        state.apply_transition(transition)
    }
}
