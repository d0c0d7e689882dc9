//! Per-principal active board selection.

use crate::tenancy::domain::{BoardId, CompanyId, UserId};
use serde::{Deserialize, Serialize};

/// The board and company a principal is currently working in.
///
/// The stored board is only a pointer. Every access still goes through the
/// permission resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    user_id: UserId,
    active_company_id: Option<CompanyId>,
    active_board_id: Option<BoardId>,
    cross_tenant_company_id: Option<CompanyId>,
}

impl SessionContext {
    /// Starts a context in the user's own company with no active board.
    #[must_use]
    pub const fn new(user_id: UserId, home_company: Option<CompanyId>) -> Self {
        Self {
            user_id,
            active_company_id: home_company,
            active_board_id: None,
            cross_tenant_company_id: None,
        }
    }

    /// Returns the principal owning this context.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the company currently in view.
    #[must_use]
    pub const fn active_company_id(&self) -> Option<CompanyId> {
        self.active_company_id
    }

    /// Returns the selected board.
    #[must_use]
    pub const fn active_board_id(&self) -> Option<BoardId> {
        self.active_board_id
    }

    /// Returns the foreign company a platform admin is viewing, if any.
    #[must_use]
    pub const fn cross_tenant_company_id(&self) -> Option<CompanyId> {
        self.cross_tenant_company_id
    }

    /// Returns `true` while a platform admin views another company.
    #[must_use]
    pub const fn is_cross_tenant(&self) -> bool {
        self.cross_tenant_company_id.is_some()
    }

    /// Selects `board_id` of `board_company`.
    ///
    /// When the board's company differs from `home_company` the context
    /// records it as a cross-tenant view.
    pub fn select_board(
        &mut self,
        board_id: BoardId,
        board_company: CompanyId,
        home_company: Option<CompanyId>,
    ) {
        self.active_board_id = Some(board_id);
        self.active_company_id = Some(board_company);
        self.cross_tenant_company_id =
            (home_company != Some(board_company)).then_some(board_company);
    }

    /// Drops the board selection and returns to `home_company`.
    pub const fn reset(&mut self, home_company: Option<CompanyId>) {
        self.active_board_id = None;
        self.active_company_id = home_company;
        self.cross_tenant_company_id = None;
    }
}
