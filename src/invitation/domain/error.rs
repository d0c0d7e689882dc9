//! Error types for invitation domain validation and parsing.

use super::InvitationStatus;
use thiserror::Error;

/// Errors returned by invitation domain operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvitationDomainError {
    /// The presented token is blank.
    #[error("invitation token must not be empty")]
    EmptyToken,

    /// The requested status change is not part of the state machine.
    #[error("invitation cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: InvitationStatus,
        /// Requested status.
        to: InvitationStatus,
    },
}

/// Error returned while parsing invitation statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown invitation status: {0}")]
pub struct ParseInvitationStatusError(pub String);
