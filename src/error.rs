//! Error taxonomy shared by every service in the engine.
//!
//! Each service defines its own `thiserror` enum with operation-specific
//! variants. Those enums implement [`Classified`] so the calling layer can
//! branch on a coarse [`ErrorKind`] and render a precise message from the
//! stable [`Classified::reason_code`] without the engine knowing anything
//! about presentation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The principal lacks the required role. Always fail-closed.
    Unauthorized,
    /// A referenced company, board, user, or invitation does not exist.
    NotFound,
    /// The request collides with existing state (duplicate pending
    /// invitation, existing membership, and similar).
    Conflict,
    /// The invitation is past its validity window.
    Expired,
    /// The requested state would break a tenancy invariant. Rejected before
    /// any write is applied.
    InvariantViolation,
    /// The backing store failed. The only fatal kind.
    Infrastructure,
}

impl ErrorKind {
    /// Returns the canonical snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Expired => "expired",
            Self::InvariantViolation => "invariant_violation",
            Self::Infrastructure => "infrastructure",
        }
    }

    /// Returns `true` when the failure should terminate the request instead
    /// of being rendered as a refusal.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Infrastructure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by service errors that surface to the calling layer.
pub trait Classified {
    /// Returns the taxonomy bucket for this failure.
    fn kind(&self) -> ErrorKind;

    /// Returns a stable, snake-case reason code for this failure.
    fn reason_code(&self) -> &'static str;
}
