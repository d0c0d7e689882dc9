//! Error types for tenancy domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing tenancy domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TenancyDomainError {
    /// The email address is not of the form `local@domain.tld`.
    #[error("invalid email address '{0}'")]
    InvalidEmail(String),

    /// The username is empty after trimming.
    #[error("username must not be empty")]
    EmptyUsername,

    /// The company name is empty after trimming.
    #[error("company name must not be empty")]
    EmptyCompanyName,

    /// The board name is empty after trimming.
    #[error("board name must not be empty")]
    EmptyBoardName,
}

/// Error returned while parsing system or board roles from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);
