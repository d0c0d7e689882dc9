//! Invitation aggregate root.

use super::{InvitationDomainError, InvitationId, InvitationStatus, InvitationToken, TokenDigest};
use crate::tenancy::domain::{CompanyId, EmailAddress, UserId};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A single-use, time-limited offer to join a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    id: InvitationId,
    company_id: CompanyId,
    email: EmailAddress,
    token_digest: TokenDigest,
    status: InvitationStatus,
    issued_by: UserId,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedInvitationData {
    /// Persisted invitation identifier.
    pub id: InvitationId,
    /// Persisted target company.
    pub company_id: CompanyId,
    /// Persisted target email.
    pub email: EmailAddress,
    /// Persisted token digest.
    pub token_digest: TokenDigest,
    /// Persisted status.
    pub status: InvitationStatus,
    /// Persisted issuing user.
    pub issued_by: UserId,
    /// Persisted expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest status change timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A freshly issued invitation and its plaintext token.
///
/// The token is not recoverable from the invitation afterwards.
#[derive(Debug, Clone)]
pub struct IssuedInvitation {
    /// The stored invitation.
    pub invitation: Invitation,
    /// The secret to deliver to the invitee.
    pub token: InvitationToken,
}

impl Invitation {
    /// Issues a pending invitation valid for `ttl`.
    #[must_use]
    pub fn issue(
        company_id: CompanyId,
        email: EmailAddress,
        issued_by: UserId,
        ttl: TimeDelta,
        clock: &impl Clock,
    ) -> IssuedInvitation {
        let token = InvitationToken::generate();
        let timestamp = clock.utc();
        let invitation = Self {
            id: InvitationId::new(),
            company_id,
            email,
            token_digest: token.digest(),
            status: InvitationStatus::Pending,
            issued_by,
            expires_at: timestamp + ttl,
            created_at: timestamp,
            updated_at: timestamp,
        };
        IssuedInvitation { invitation, token }
    }

    /// Reconstructs an invitation from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedInvitationData) -> Self {
        Self {
            id: data.id,
            company_id: data.company_id,
            email: data.email,
            token_digest: data.token_digest,
            status: data.status,
            issued_by: data.issued_by,
            expires_at: data.expires_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the invitation identifier.
    #[must_use]
    pub const fn id(&self) -> InvitationId {
        self.id
    }

    /// Returns the target company.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the invited email address.
    #[must_use]
    pub const fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the stored token digest.
    #[must_use]
    pub const fn token_digest(&self) -> &TokenDigest {
        &self.token_digest
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> InvitationStatus {
        self.status
    }

    /// Returns the issuing user.
    #[must_use]
    pub const fn issued_by(&self) -> UserId {
        self.issued_by
    }

    /// Returns the expiry timestamp.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest status change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when the invitation is still pending but its validity
    /// window closed before `now`.
    #[must_use]
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending && now > self.expires_at
    }

    /// Moves the invitation to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`InvitationDomainError::InvalidTransition`] for any change
    /// outside `pending -> accepted` and `pending -> expired`.
    pub fn transition_to(
        &mut self,
        next: InvitationStatus,
        at: DateTime<Utc>,
    ) -> Result<(), InvitationDomainError> {
        if !self.status.can_transition_to(next) {
            return Err(InvitationDomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}
