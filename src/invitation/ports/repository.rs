//! Repository port for invitation persistence and acceptance.

use crate::error::{Classified, ErrorKind};
use crate::invitation::domain::{Invitation, InvitationId, InvitationStatus, TokenDigest};
use crate::tenancy::{
    domain::{CompanyId, CompanyTransition, EmailAddress},
    ports::TenancyRepositoryError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for invitation repository operations.
pub type InvitationRepositoryResult<T> = Result<T, InvitationRepositoryError>;

/// The atomic unit committed when an invitation is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvitationAcceptance {
    /// Invitation being consumed.
    pub invitation_id: InvitationId,
    /// Company join of the accepting user.
    pub transition: CompanyTransition,
    /// Acceptance timestamp.
    pub at: DateTime<Utc>,
}

/// Invitation persistence contract.
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Stores a new pending invitation.
    ///
    /// # Errors
    ///
    /// Returns [`InvitationRepositoryError::DuplicatePending`] when a pending
    /// invitation already exists for the same company and email.
    async fn insert_pending(&self, invitation: &Invitation) -> InvitationRepositoryResult<()>;

    /// Finds an invitation by identifier.
    async fn find_by_id(&self, id: InvitationId)
    -> InvitationRepositoryResult<Option<Invitation>>;

    /// Finds an invitation by token digest, regardless of status.
    async fn find_by_token(
        &self,
        digest: &TokenDigest,
    ) -> InvitationRepositoryResult<Option<Invitation>>;

    /// Finds the pending invitation for a company and email, if any.
    async fn find_pending(
        &self,
        company_id: CompanyId,
        email: &EmailAddress,
    ) -> InvitationRepositoryResult<Option<Invitation>>;

    /// Lists a company's invitations, newest first.
    async fn list_for_company(
        &self,
        company_id: CompanyId,
    ) -> InvitationRepositoryResult<Vec<Invitation>>;

    /// Flips a pending invitation to `expired`.
    ///
    /// Compare-and-set on the status: returns `true` when this call made the
    /// change and `false` when the invitation was no longer pending.
    ///
    /// # Errors
    ///
    /// Returns [`InvitationRepositoryError::NotFound`] for unknown ids.
    async fn mark_expired(
        &self,
        id: InvitationId,
        at: DateTime<Utc>,
    ) -> InvitationRepositoryResult<bool>;

    /// Consumes a pending invitation and applies the accepting user's company
    /// join as one atomic unit.
    ///
    /// The status change is a compare-and-set: of several concurrent calls
    /// for the same invitation exactly one succeeds. The expiry is checked
    /// against `acceptance.at` inside the same unit; a lapsed invitation is
    /// flipped to `expired` instead of being accepted.
    ///
    /// # Errors
    ///
    /// Returns [`InvitationRepositoryError::NotPending`] when another caller
    /// consumed or expired the invitation first,
    /// [`InvitationRepositoryError::Lapsed`] when the invitation expired
    /// before `acceptance.at`, and
    /// [`InvitationRepositoryError::Tenancy`] when the company join is
    /// refused (for example [`TenancyRepositoryError::StaleCompany`]).
    async fn accept(
        &self,
        acceptance: &InvitationAcceptance,
    ) -> InvitationRepositoryResult<Invitation>;
}

/// Errors returned by invitation repository implementations.
#[derive(Debug, Clone, Error)]
pub enum InvitationRepositoryError {
    /// An invitation with the same identifier already exists.
    #[error("duplicate invitation identifier: {0}")]
    DuplicateInvitation(InvitationId),

    /// A pending invitation for the pair already exists.
    #[error("a pending invitation for {email} to company {company_id} already exists")]
    DuplicatePending {
        /// Target company.
        company_id: CompanyId,
        /// Target email.
        email: EmailAddress,
    },

    /// The invitation does not exist.
    #[error("invitation not found: {0}")]
    NotFound(InvitationId),

    /// The invitation left `pending` before this call.
    #[error("invitation {id} is {status}")]
    NotPending {
        /// Invitation identifier.
        id: InvitationId,
        /// Status observed by the compare-and-set.
        status: InvitationStatus,
    },

    /// The invitation lapsed before the acceptance time; it is now `expired`.
    #[error("invitation {id} expired at {expires_at}")]
    Lapsed {
        /// Invitation identifier.
        id: InvitationId,
        /// Expiry of the invitation.
        expires_at: DateTime<Utc>,
    },

    /// The tenancy half of an atomic operation was refused.
    #[error(transparent)]
    Tenancy(#[from] TenancyRepositoryError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl InvitationRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

impl Classified for InvitationRepositoryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateInvitation(_) | Self::DuplicatePending { .. } | Self::NotPending { .. } => {
                ErrorKind::Conflict
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Lapsed { .. } => ErrorKind::Expired,
            Self::Tenancy(err) => err.kind(),
            Self::Persistence(_) => ErrorKind::Infrastructure,
        }
    }

    fn reason_code(&self) -> &'static str {
        match self {
            Self::DuplicateInvitation(_) => "duplicate_invitation",
            Self::DuplicatePending { .. } => "duplicate_pending",
            Self::NotFound(_) => "invitation_not_found",
            Self::NotPending { .. } => "not_pending",
            Self::Lapsed { .. } => "invitation_expired",
            Self::Tenancy(err) => err.reason_code(),
            Self::Persistence(_) => "persistence",
        }
    }
}
