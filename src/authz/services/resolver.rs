//! Store-backed permission resolution.

use crate::authz::domain::{AccessibleBoard, EffectiveRole, Principal, RequiredRoles, resolve};
use crate::tenancy::{
    domain::{BoardId, CompanyId, UserId},
    ports::{TenancyRepository, TenancyRepositoryResult},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Answers "may this principal act on this board or company?".
///
/// Lookups never fail on missing entities: an unknown user, board, or
/// company simply yields no access. Only store failures are errors.
pub struct PermissionResolver<R>
where
    R: TenancyRepository,
{
    repository: Arc<R>,
}

impl<R> Clone for PermissionResolver<R>
where
    R: TenancyRepository,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> PermissionResolver<R>
where
    R: TenancyRepository,
{
    /// Creates a resolver over the tenancy store.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Loads the current principal for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns the store error when the lookup fails.
    pub async fn principal(&self, user_id: UserId) -> TenancyRepositoryResult<Option<Principal>> {
        let user = self.repository.find_user(user_id).await?;
        Ok(user.as_ref().map(Principal::from_user))
    }

    /// Resolves how `user_id` may access `board_id`, if at all.
    ///
    /// # Errors
    ///
    /// Returns the store error when a lookup fails.
    pub async fn resolve_effective_role(
        &self,
        user_id: UserId,
        board_id: BoardId,
    ) -> TenancyRepositoryResult<Option<EffectiveRole>> {
        let Some(principal) = self.principal(user_id).await? else {
            debug!(user_id = %user_id, board_id = %board_id, "unknown principal has no access");
            return Ok(None);
        };
        self.effective_role_for(&principal, board_id).await
    }

    /// Resolves access for an already loaded principal.
    ///
    /// # Errors
    ///
    /// Returns the store error when a lookup fails.
    pub async fn effective_role_for(
        &self,
        principal: &Principal,
        board_id: BoardId,
    ) -> TenancyRepositoryResult<Option<EffectiveRole>> {
        let Some(board) = self.repository.find_board(board_id).await? else {
            debug!(board_id = %board_id, "unknown board grants no access");
            return Ok(None);
        };
        let explicit = if principal.is_platform_admin() {
            None
        } else {
            self.repository
                .find_membership(board_id, principal.user_id())
                .await?
                .map(|membership| membership.role())
        };
        let effective = resolve(principal, &board, explicit);
        debug!(
            user_id = %principal.user_id(),
            board_id = %board_id,
            effective = ?effective,
            "resolved effective board role"
        );
        Ok(effective)
    }

    /// Returns `true` when `user_id` holds one of `required` on `board_id`.
    ///
    /// Overrides satisfy every set; explicit roles must be listed exactly.
    ///
    /// # Errors
    ///
    /// Returns the store error when a lookup fails.
    pub async fn has_permission(
        &self,
        user_id: UserId,
        board_id: BoardId,
        required: &RequiredRoles,
    ) -> TenancyRepositoryResult<bool> {
        let effective = self.resolve_effective_role(user_id, board_id).await?;
        Ok(effective.is_some_and(|role| role.satisfies(required)))
    }

    /// [`Self::has_permission`] for an already loaded principal.
    ///
    /// # Errors
    ///
    /// Returns the store error when a lookup fails.
    pub async fn permits(
        &self,
        principal: &Principal,
        board_id: BoardId,
        required: &RequiredRoles,
    ) -> TenancyRepositoryResult<bool> {
        let effective = self.effective_role_for(principal, board_id).await?;
        Ok(effective.is_some_and(|role| role.satisfies(required)))
    }

    /// Lists the boards `user_id` may open in one company, ordered by name.
    ///
    /// The company is `company_filter` when given and the user's own company
    /// otherwise. Company admins see every board of their company, members
    /// only the boards they hold a membership on, and platform admins every
    /// board of whichever company they filter by. Without a company to list
    /// the result is empty.
    ///
    /// # Errors
    ///
    /// Returns the store error when a lookup fails.
    pub async fn accessible_boards(
        &self,
        user_id: UserId,
        company_filter: Option<CompanyId>,
    ) -> TenancyRepositoryResult<Vec<AccessibleBoard>> {
        let Some(principal) = self.principal(user_id).await? else {
            debug!(user_id = %user_id, "unknown principal lists no boards");
            return Ok(Vec::new());
        };
        let Some(company_id) = company_filter.or(principal.company_id()) else {
            debug!(user_id = %user_id, "no company to list boards for");
            return Ok(Vec::new());
        };

        let explicit: HashMap<BoardId, _> = self
            .repository
            .list_memberships_for_user(user_id)
            .await?
            .into_iter()
            .map(|membership| (membership.board_id(), membership.role()))
            .collect();
        let boards = self.repository.list_boards_for_company(company_id).await?;
        let accessible: Vec<AccessibleBoard> = boards
            .into_iter()
            .filter_map(|board| {
                let granted = explicit.get(&board.id()).copied();
                resolve(&principal, &board, granted)
                    .map(|access| AccessibleBoard::new(board, access))
            })
            .collect();
        debug!(
            user_id = %user_id,
            company_id = %company_id,
            count = accessible.len(),
            "listed accessible boards"
        );
        Ok(accessible)
    }

    /// Returns `true` when `user_id` administers `company_id`.
    ///
    /// # Errors
    ///
    /// Returns the store error when a lookup fails.
    pub async fn can_administer_company(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> TenancyRepositoryResult<bool> {
        let principal = self.principal(user_id).await?;
        Ok(principal.is_some_and(|p| p.can_administer(company_id)))
    }
}
