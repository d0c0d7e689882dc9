//! Explicit board membership.

use super::{BoardId, BoardRole, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A user's explicit role on one board. Unique per (board, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMembership {
    board_id: BoardId,
    user_id: UserId,
    role: BoardRole,
    granted_at: DateTime<Utc>,
}

impl BoardMembership {
    /// Grants `role` on `board_id` to `user_id`.
    #[must_use]
    pub fn grant(board_id: BoardId, user_id: UserId, role: BoardRole, clock: &impl Clock) -> Self {
        Self {
            board_id,
            user_id,
            role,
            granted_at: clock.utc(),
        }
    }

    /// Reconstructs a membership from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        board_id: BoardId,
        user_id: UserId,
        role: BoardRole,
        granted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            board_id,
            user_id,
            role,
            granted_at,
        }
    }

    /// Returns the board.
    #[must_use]
    pub const fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// Returns the member.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the granted role.
    #[must_use]
    pub const fn role(&self) -> BoardRole {
        self.role
    }

    /// Returns when the current role was granted.
    #[must_use]
    pub const fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    /// Replaces the granted role.
    pub const fn change_role(&mut self, role: BoardRole, at: DateTime<Utc>) {
        self.role = role;
        self.granted_at = at;
    }
}
