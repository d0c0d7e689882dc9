//! Single-use invitation secrets and their at-rest digests.
//!
//! The plaintext token is handed to the issuer exactly once. Stores only
//! ever see the SHA-256 [`TokenDigest`], so a leaked invitations table does
//! not leak acceptable tokens.

use super::InvitationDomainError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of random bytes in a generated token.
pub const TOKEN_BYTES: usize = 32;

/// Plaintext invitation secret.
#[derive(Clone, PartialEq, Eq)]
pub struct InvitationToken(String);

impl InvitationToken {
    /// Generates a fresh token from the thread-local CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; TOKEN_BYTES];
        rand::rng().fill(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wraps a token presented by a caller.
    ///
    /// # Errors
    ///
    /// Returns [`InvitationDomainError::EmptyToken`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, InvitationDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvitationDomainError::EmptyToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the plaintext secret for delivery to the invitee.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Computes the digest under which the invitation is stored.
    #[must_use]
    pub fn digest(&self) -> TokenDigest {
        let hash = Sha256::digest(self.0.as_bytes());
        TokenDigest(hex::encode(hash))
    }
}

impl fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvitationToken(<redacted>)")
    }
}

/// Hex-encoded SHA-256 digest of an invitation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenDigest(String);

impl TokenDigest {
    /// Reconstructs a digest read from storage.
    #[must_use]
    pub const fn from_persisted(value: String) -> Self {
        Self(value)
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
