//! Boards listed together with the access that makes them visible.

use super::EffectiveRole;
use crate::tenancy::domain::Board;

/// A board the principal may open, and how it came to hold that access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibleBoard {
    board: Board,
    access: EffectiveRole,
}

impl AccessibleBoard {
    /// Pairs a board with the access resolved for it.
    #[must_use]
    pub const fn new(board: Board, access: EffectiveRole) -> Self {
        Self { board, access }
    }

    /// Returns the board.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the resolved access.
    #[must_use]
    pub const fn access(&self) -> EffectiveRole {
        self.access
    }
}
