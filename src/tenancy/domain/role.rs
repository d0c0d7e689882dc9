//! Role vocabulary for the platform, company, and board scopes.
//!
//! A user carries exactly one [`SystemRole`], which covers both the platform
//! scope (`platform_admin` or not) and the company scope (`company_admin` or
//! plain `member`). Board-scoped roles live on explicit memberships as
//! [`BoardRole`]. The two vocabularies are deliberately separate types: a
//! system role never compares against a board role.

use super::ParseRoleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// System-wide role stored on each user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    /// Unconditional access to every company and board.
    PlatformAdmin,
    /// Administers the user's own company and every board in it.
    CompanyAdmin,
    /// Plain company member; board access comes from explicit memberships.
    Member,
}

impl SystemRole {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlatformAdmin => "platform_admin",
            Self::CompanyAdmin => "company_admin",
            Self::Member => "member",
        }
    }

    /// Returns `true` for [`SystemRole::PlatformAdmin`].
    #[must_use]
    pub const fn is_platform_admin(self) -> bool {
        matches!(self, Self::PlatformAdmin)
    }

    /// Returns `true` for [`SystemRole::CompanyAdmin`].
    #[must_use]
    pub const fn is_company_admin(self) -> bool {
        matches!(self, Self::CompanyAdmin)
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SystemRole {
    type Error = ParseRoleError;

    /// Parses a stored role name. The legacy names `super_admin` and `user`
    /// are accepted for rows written by older deployments.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "platform_admin" | "super_admin" => Ok(Self::PlatformAdmin),
            "company_admin" => Ok(Self::CompanyAdmin),
            "member" | "user" => Ok(Self::Member),
            _ => Err(ParseRoleError(value.to_owned())),
        }
    }
}

/// Role granted by an explicit board membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoardRole {
    /// Read-only access.
    #[serde(rename = "board_viewer")]
    Viewer,
    /// May change board content.
    #[serde(rename = "board_editor")]
    Editor,
    /// May manage board settings and members.
    #[serde(rename = "board_admin")]
    Admin,
}

impl BoardRole {
    /// Every board role, lowest first.
    pub const ALL: [Self; 3] = [Self::Viewer, Self::Editor, Self::Admin];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "board_viewer",
            Self::Editor => "board_editor",
            Self::Admin => "board_admin",
        }
    }
}

impl fmt::Display for BoardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BoardRole {
    type Error = ParseRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "board_viewer" => Ok(Self::Viewer),
            "board_editor" => Ok(Self::Editor),
            "board_admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError(value.to_owned())),
        }
    }
}
