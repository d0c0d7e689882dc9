//! Invitation status state machine.

use super::ParseInvitationStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an invitation.
///
/// `Pending` is the only non-terminal state. Transitions are monotone:
/// `Pending -> Accepted` and `Pending -> Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// Issued and not yet consumed.
    Pending,
    /// Consumed by exactly one successful acceptance.
    Accepted,
    /// Lapsed past its expiry timestamp.
    Expired,
}

impl InvitationStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
        }
    }

    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns `true` when moving from `self` to `next` is permitted.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted | Self::Expired)
        )
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for InvitationStatus {
    type Error = ParseInvitationStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "expired" => Ok(Self::Expired),
            _ => Err(ParseInvitationStatusError(value.to_owned())),
        }
    }
}
