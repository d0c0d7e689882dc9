//! Company placement changes.
//!
//! Every mutation of a user's company (joining through an invitation,
//! removal by an admin, a platform-admin transfer, creating a company) is
//! planned here as a [`CompanyTransition`] and then applied by the tenancy
//! store in a single atomic write.

use super::{CompanyId, SystemRole, User, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A planned change of a user's company placement and system role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyTransition {
    user_id: UserId,
    from: Option<CompanyId>,
    to: Option<CompanyId>,
    previous_role: SystemRole,
    role: SystemRole,
    at: DateTime<Utc>,
}

impl CompanyTransition {
    /// Plans moving `user` to `target` (or out of any company when `None`).
    ///
    /// - A platform admin keeps its role wherever it goes.
    /// - Leaving a company always ends company administration of it.
    /// - Joining a company yields `member` unless `grant_company_admin` is
    ///   set by the acting administrator.
    /// - Staying in the same company keeps the current role unless
    ///   administration is granted.
    #[must_use]
    pub fn plan(
        user: &User,
        target: Option<CompanyId>,
        grant_company_admin: bool,
        clock: &impl Clock,
    ) -> Self {
        let from = user.company_id();
        let role = if user.is_platform_admin() {
            SystemRole::PlatformAdmin
        } else if target.is_none() {
            SystemRole::Member
        } else if grant_company_admin {
            SystemRole::CompanyAdmin
        } else if target == from {
            user.role()
        } else {
            SystemRole::Member
        };

        Self {
            user_id: user.id(),
            from,
            to: target,
            previous_role: user.role(),
            role,
            at: clock.utc(),
        }
    }

    /// Returns the user being moved.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the company the plan was computed against.
    ///
    /// Stores treat this as the expected current value and reject the
    /// transition when the user has moved in the meantime.
    #[must_use]
    pub const fn from(&self) -> Option<CompanyId> {
        self.from
    }

    /// Returns the destination company.
    #[must_use]
    pub const fn to(&self) -> Option<CompanyId> {
        self.to
    }

    /// Returns the role the user holds after the transition.
    #[must_use]
    pub const fn role(&self) -> SystemRole {
        self.role
    }

    /// Returns when the transition was planned.
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Returns `true` when the user's company changes.
    #[must_use]
    pub fn changes_company(&self) -> bool {
        self.from != self.to
    }

    /// Returns the company whose board memberships must be purged, if any.
    #[must_use]
    pub fn vacated_company(&self) -> Option<CompanyId> {
        if self.changes_company() {
            self.from
        } else {
            None
        }
    }

    /// Returns the company that loses this user as an administrator, if any.
    ///
    /// Stores use this to refuse transitions that would leave a company
    /// without any `company_admin`.
    #[must_use]
    pub fn relinquished_administration(&self) -> Option<CompanyId> {
        let was_admin = self.previous_role.is_company_admin();
        let stays_admin = self.role.is_company_admin() && !self.changes_company();
        if was_admin && !stays_admin {
            self.from
        } else {
            None
        }
    }
}
