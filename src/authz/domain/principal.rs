//! The acting identity of a request.

use crate::tenancy::domain::{CompanyId, SystemRole, User, UserId};
use serde::{Deserialize, Serialize};

/// Snapshot of the user a request acts as.
///
/// Loaded fresh from the tenancy store for every decision, so a role change
/// or company move takes effect on the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    user_id: UserId,
    role: SystemRole,
    company_id: Option<CompanyId>,
}

impl Principal {
    /// Builds a principal from explicit parts.
    #[must_use]
    pub const fn new(user_id: UserId, role: SystemRole, company_id: Option<CompanyId>) -> Self {
        Self {
            user_id,
            role,
            company_id,
        }
    }

    /// Captures the current placement of `user`.
    #[must_use]
    pub const fn from_user(user: &User) -> Self {
        Self::new(user.id(), user.role(), user.company_id())
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the system role.
    #[must_use]
    pub const fn role(&self) -> SystemRole {
        self.role
    }

    /// Returns the company, if any.
    #[must_use]
    pub const fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    /// Returns `true` for platform administrators.
    #[must_use]
    pub const fn is_platform_admin(&self) -> bool {
        self.role.is_platform_admin()
    }

    /// Returns `true` when the principal administers `company_id`, either
    /// as its company admin or as a platform admin.
    #[must_use]
    pub fn can_administer(&self, company_id: CompanyId) -> bool {
        self.is_platform_admin()
            || (self.role.is_company_admin() && self.company_id == Some(company_id))
    }
}
