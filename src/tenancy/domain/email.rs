//! Validated, case-insensitive email address.

use super::TenancyDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Email address normalised to lowercase.
///
/// Invitation acceptance compares addresses case-insensitively, so the
/// normalised form is the only one kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses and normalises an email address.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyDomainError::InvalidEmail`] when the value lacks a
    /// single `@`, has an empty local part, a domain without a dot, or
    /// contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, TenancyDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        let mut parts = trimmed.split('@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();
        let is_valid = parts.next().is_none()
            && !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !trimmed.chars().any(char::is_whitespace);

        if !is_valid {
            return Err(TenancyDomainError::InvalidEmail(raw));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Returns the normalised address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = TenancyDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
