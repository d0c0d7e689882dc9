//! Closed sets of acceptable board roles.

use crate::tenancy::domain::BoardRole;
use std::fmt;

/// The board roles an operation accepts.
///
/// Membership is exact: an explicit `board_admin` does not satisfy a set
/// that only lists `board_viewer`. Use the named sets, which list every
/// role at or above their threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequiredRoles {
    viewer: bool,
    editor: bool,
    admin: bool,
}

impl RequiredRoles {
    /// Any explicit board role.
    pub const ANY_MEMBER: Self = Self {
        viewer: true,
        editor: true,
        admin: true,
    };

    /// Roles that may change board content.
    pub const EDITORS: Self = Self {
        viewer: false,
        editor: true,
        admin: true,
    };

    /// Roles that may manage the board.
    pub const ADMINS: Self = Self {
        viewer: false,
        editor: false,
        admin: true,
    };

    /// Builds a set from an explicit list of roles.
    #[must_use]
    pub fn of(roles: &[BoardRole]) -> Self {
        Self {
            viewer: roles.contains(&BoardRole::Viewer),
            editor: roles.contains(&BoardRole::Editor),
            admin: roles.contains(&BoardRole::Admin),
        }
    }

    /// Returns `true` when `role` is in the set.
    #[must_use]
    pub const fn contains(&self, role: BoardRole) -> bool {
        match role {
            BoardRole::Viewer => self.viewer,
            BoardRole::Editor => self.editor,
            BoardRole::Admin => self.admin,
        }
    }

    /// Returns `true` when no role satisfies the set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.viewer || self.editor || self.admin)
    }

    /// Iterates over the roles in the set, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = BoardRole> + '_ {
        BoardRole::ALL.into_iter().filter(|role| self.contains(*role))
    }
}

impl fmt::Display for RequiredRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(BoardRole::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
