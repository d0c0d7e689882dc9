//! The ordered override chain that yields an effective board role.

use super::{Principal, RequiredRoles};
use crate::tenancy::domain::{Board, BoardRole};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a principal came to hold access to a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "role")]
pub enum EffectiveRole {
    /// Platform administrators reach every board.
    PlatformOverride,
    /// Company administrators act as `board_admin` on their company's boards.
    CompanyAdminOverride,
    /// Access granted by an explicit membership.
    Explicit(BoardRole),
}

impl EffectiveRole {
    /// Returns the board role this access is equivalent to.
    ///
    /// Both overrides are `board_admin`-equivalent.
    #[must_use]
    pub const fn board_role(self) -> BoardRole {
        match self {
            Self::PlatformOverride | Self::CompanyAdminOverride => BoardRole::Admin,
            Self::Explicit(role) => role,
        }
    }

    /// Returns `true` when this access satisfies `required`.
    ///
    /// Overrides satisfy every set; explicit roles must be listed.
    #[must_use]
    pub const fn satisfies(self, required: &RequiredRoles) -> bool {
        match self {
            Self::PlatformOverride | Self::CompanyAdminOverride => true,
            Self::Explicit(role) => required.contains(role),
        }
    }

    /// Returns `true` for either override.
    #[must_use]
    pub const fn is_override(self) -> bool {
        !matches!(self, Self::Explicit(_))
    }
}

impl fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlatformOverride => f.write_str("platform_override"),
            Self::CompanyAdminOverride => f.write_str("company_admin_override"),
            Self::Explicit(role) => write!(f, "explicit:{role}"),
        }
    }
}

/// A single step of the override chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessRule {
    /// `platform_admin` reaches everything.
    PlatformOverride,
    /// `company_admin` of the board's company.
    CompanyAdminOverride,
    /// The principal's explicit membership on the board.
    ExplicitMembership,
}

impl AccessRule {
    /// The rules in evaluation order. The first match wins.
    pub const CHAIN: [Self; 3] = [
        Self::PlatformOverride,
        Self::CompanyAdminOverride,
        Self::ExplicitMembership,
    ];

    /// Evaluates this rule alone.
    #[must_use]
    pub fn evaluate(
        self,
        principal: &Principal,
        board: &Board,
        explicit: Option<BoardRole>,
    ) -> Option<EffectiveRole> {
        match self {
            Self::PlatformOverride => principal
                .is_platform_admin()
                .then_some(EffectiveRole::PlatformOverride),
            Self::CompanyAdminOverride => (principal.role().is_company_admin()
                && principal.company_id() == Some(board.company_id()))
            .then_some(EffectiveRole::CompanyAdminOverride),
            Self::ExplicitMembership => explicit.map(EffectiveRole::Explicit),
        }
    }
}

/// Runs the override chain for `principal` on `board`.
///
/// `explicit` is the principal's membership role on the board, if any.
#[must_use]
pub fn resolve(
    principal: &Principal,
    board: &Board,
    explicit: Option<BoardRole>,
) -> Option<EffectiveRole> {
    AccessRule::CHAIN
        .into_iter()
        .find_map(|rule| rule.evaluate(principal, board, explicit))
}
