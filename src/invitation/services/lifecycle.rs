//! Invitation issue, acceptance, and lazy expiry.

use crate::authz::services::PermissionResolver;
use crate::config::EngineConfig;
use crate::error::{Classified, ErrorKind};
use crate::invitation::{
    domain::{Invitation, InvitationStatus, InvitationToken, IssuedInvitation},
    ports::{InvitationAcceptance, InvitationRepository, InvitationRepositoryError},
};
use crate::tenancy::{
    domain::{CompanyId, CompanyTransition, EmailAddress, TenancyDomainError, UserId},
    ports::{TenancyRepository, TenancyRepositoryError},
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by [`InvitationService::issue`].
#[derive(Debug, Error)]
pub enum IssueInvitationError {
    /// The target email does not parse.
    #[error(transparent)]
    InvalidEmail(TenancyDomainError),

    /// The issuer does not administer the company.
    #[error("user {user_id} may not invite users to company {company_id}")]
    Unauthorized {
        /// Issuing user.
        user_id: UserId,
        /// Target company.
        company_id: CompanyId,
    },

    /// The company does not exist.
    #[error("company not found: {0}")]
    CompanyNotFound(CompanyId),

    /// The invitee is already a member of the company.
    #[error("{email} is already a member of company {company_id}")]
    AlreadyMember {
        /// Invitee email.
        email: EmailAddress,
        /// Target company.
        company_id: CompanyId,
    },

    /// The invitee belongs to another company.
    #[error("{0} already belongs to another company")]
    AlreadyInOtherCompany(EmailAddress),

    /// A live pending invitation already exists for the pair.
    #[error("a pending invitation for {email} to company {company_id} already exists")]
    DuplicatePending {
        /// Target company.
        company_id: CompanyId,
        /// Invitee email.
        email: EmailAddress,
    },

    /// The store failed.
    #[error(transparent)]
    Repository(#[from] InvitationRepositoryError),
}

impl From<TenancyRepositoryError> for IssueInvitationError {
    fn from(err: TenancyRepositoryError) -> Self {
        Self::Repository(err.into())
    }
}

impl Classified for IssueInvitationError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEmail(_) => ErrorKind::InvariantViolation,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::CompanyNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyMember { .. }
            | Self::AlreadyInOtherCompany(_)
            | Self::DuplicatePending { .. } => ErrorKind::Conflict,
            Self::Repository(err) => err.kind(),
        }
    }

    fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "invalid_email",
            Self::Unauthorized { .. } => "unauthorized",
            Self::CompanyNotFound(_) => "company_not_found",
            Self::AlreadyMember { .. } => "already_member",
            Self::AlreadyInOtherCompany(_) => "already_in_other_company",
            Self::DuplicatePending { .. } => "duplicate_pending",
            Self::Repository(err) => err.reason_code(),
        }
    }
}

/// Errors returned by [`InvitationService::accept`] and
/// [`InvitationService::preview`].
#[derive(Debug, Error)]
pub enum AcceptInvitationError {
    /// No invitation matches the token.
    #[error("invitation not found")]
    NotFound,

    /// The invitation was already accepted or expired.
    #[error("invitation is {0}")]
    NotPending(InvitationStatus),

    /// The invitation lapsed; it is now marked `expired`.
    #[error("invitation expired at {0}")]
    Expired(DateTime<Utc>),

    /// The accepting user does not exist.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(UserId),

    /// The accepting user's email differs from the invited one.
    #[error("invitation was issued to a different email address")]
    EmailMismatch,

    /// The accepting user already belongs to a company.
    #[error("user {0} already belongs to a company")]
    AlreadyInCompany(UserId),

    /// The store failed.
    #[error(transparent)]
    Repository(#[from] InvitationRepositoryError),
}

impl From<TenancyRepositoryError> for AcceptInvitationError {
    fn from(err: TenancyRepositoryError) -> Self {
        Self::Repository(err.into())
    }
}

impl Classified for AcceptInvitationError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::NotPending(_) | Self::AlreadyInCompany(_) => ErrorKind::Conflict,
            Self::Expired(_) => ErrorKind::Expired,
            Self::UnknownPrincipal(_) | Self::EmailMismatch => ErrorKind::Unauthorized,
            Self::Repository(err) => err.kind(),
        }
    }

    fn reason_code(&self) -> &'static str {
        match self {
            Self::NotFound => "invitation_not_found",
            Self::NotPending(_) => "not_pending",
            Self::Expired(_) => "expired",
            Self::UnknownPrincipal(_) => "unknown_principal",
            Self::EmailMismatch => "email_mismatch",
            Self::AlreadyInCompany(_) => "already_in_company",
            Self::Repository(err) => err.reason_code(),
        }
    }
}

/// Errors returned by [`InvitationService::list_for_company`].
#[derive(Debug, Error)]
pub enum ListInvitationsError {
    /// The actor does not administer the company.
    #[error("user {user_id} may not list invitations of company {company_id}")]
    Unauthorized {
        /// Acting user.
        user_id: UserId,
        /// Requested company.
        company_id: CompanyId,
    },

    /// The store failed.
    #[error(transparent)]
    Repository(#[from] InvitationRepositoryError),
}

impl From<TenancyRepositoryError> for ListInvitationsError {
    fn from(err: TenancyRepositoryError) -> Self {
        Self::Repository(err.into())
    }
}

impl Classified for ListInvitationsError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Repository(err) => err.kind(),
        }
    }

    fn reason_code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::Repository(err) => err.reason_code(),
        }
    }
}

/// Invitation lifecycle orchestration.
#[derive(Clone)]
pub struct InvitationService<R, C>
where
    R: TenancyRepository + InvitationRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    resolver: PermissionResolver<R>,
    clock: Arc<C>,
    ttl: TimeDelta,
}

impl<R, C> InvitationService<R, C>
where
    R: TenancyRepository + InvitationRepository,
    C: Clock + Send + Sync,
{
    /// Creates a service with the default invitation lifetime.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        let resolver = PermissionResolver::new(Arc::clone(&repository));
        Self {
            repository,
            resolver,
            clock,
            ttl: EngineConfig::default().invitation_ttl(),
        }
    }

    /// Applies engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.ttl = config.invitation_ttl();
        self
    }

    /// Issues an invitation for `email` to join `company_id`.
    ///
    /// A pending invitation for the same pair that has already lapsed is
    /// expired first and does not block the new one. The returned token is
    /// the only copy of the secret.
    ///
    /// # Errors
    ///
    /// Returns [`IssueInvitationError`] when the issuer may not invite, the
    /// company or email is invalid, or the invitee is already placed or
    /// invited.
    pub async fn issue(
        &self,
        issuer: UserId,
        company_id: CompanyId,
        email: &str,
    ) -> Result<IssuedInvitation, IssueInvitationError> {
        if !self
            .resolver
            .can_administer_company(issuer, company_id)
            .await?
        {
            return Err(refused_issue(IssueInvitationError::Unauthorized {
                user_id: issuer,
                company_id,
            }));
        }
        if self.repository.find_company(company_id).await?.is_none() {
            return Err(refused_issue(IssueInvitationError::CompanyNotFound(
                company_id,
            )));
        }
        let invitee = EmailAddress::new(email).map_err(IssueInvitationError::InvalidEmail)?;

        if let Some(existing) = self.repository.find_user_by_email(&invitee).await? {
            match existing.company_id() {
                Some(current) if current == company_id => {
                    return Err(refused_issue(IssueInvitationError::AlreadyMember {
                        email: invitee,
                        company_id,
                    }));
                }
                Some(_) => {
                    return Err(refused_issue(IssueInvitationError::AlreadyInOtherCompany(
                        invitee,
                    )));
                }
                None => {}
            }
        }

        let now = self.clock.utc();
        if let Some(pending) = self.repository.find_pending(company_id, &invitee).await? {
            if !pending.has_lapsed(now) {
                return Err(refused_issue(IssueInvitationError::DuplicatePending {
                    company_id,
                    email: invitee,
                }));
            }
            self.repository.mark_expired(pending.id(), now).await?;
            debug!(invitation_id = %pending.id(), "expired lapsed invitation before reissue");
        }

        let issued = Invitation::issue(company_id, invitee, issuer, self.ttl, &*self.clock);
        self.repository
            .insert_pending(&issued.invitation)
            .await
            .map_err(|err| match err {
                InvitationRepositoryError::DuplicatePending {
                    company_id: pending_company,
                    email: pending_email,
                } => refused_issue(IssueInvitationError::DuplicatePending {
                    company_id: pending_company,
                    email: pending_email,
                }),
                other => IssueInvitationError::Repository(other),
            })?;
        info!(
            invitation_id = %issued.invitation.id(),
            company_id = %company_id,
            issued_by = %issuer,
            expires_at = %issued.invitation.expires_at(),
            "issued invitation"
        );
        Ok(issued)
    }

    /// Accepts the invitation identified by `token` on behalf of `user_id`.
    ///
    /// Checks fail closed in this order: unknown token, not pending,
    /// expired (flipping the status as a side effect), unknown user, email
    /// mismatch, user already in a company. On success the status change
    /// and the company join commit together; of several concurrent accepts
    /// exactly one succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AcceptInvitationError`] for every refused check.
    pub async fn accept(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<Invitation, AcceptInvitationError> {
        let invitation = self.live_invitation(token).await?;

        let Some(user) = self.repository.find_user(user_id).await? else {
            return Err(refused_accept(AcceptInvitationError::UnknownPrincipal(
                user_id,
            )));
        };
        if user.email() != invitation.email() {
            return Err(refused_accept(AcceptInvitationError::EmailMismatch));
        }
        if user.company_id().is_some() {
            return Err(self.refusal_for_placed_user(&invitation, user_id).await);
        }

        let transition =
            CompanyTransition::plan(&user, Some(invitation.company_id()), false, &*self.clock);
        let acceptance = InvitationAcceptance {
            invitation_id: invitation.id(),
            transition,
            at: transition.at(),
        };
        let accepted = self
            .repository
            .accept(&acceptance)
            .await
            .map_err(|err| match err {
                InvitationRepositoryError::NotPending { status, .. } => {
                    refused_accept(AcceptInvitationError::NotPending(status))
                }
                InvitationRepositoryError::Lapsed { expires_at, .. } => {
                    refused_accept(AcceptInvitationError::Expired(expires_at))
                }
                InvitationRepositoryError::Tenancy(TenancyRepositoryError::StaleCompany(_)) => {
                    refused_accept(AcceptInvitationError::AlreadyInCompany(user_id))
                }
                other => AcceptInvitationError::Repository(other),
            })?;
        info!(
            invitation_id = %accepted.id(),
            company_id = %accepted.company_id(),
            user_id = %user_id,
            role = %transition.role(),
            "accepted invitation"
        );
        Ok(accepted)
    }

    /// Returns the pending invitation behind `token` without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`AcceptInvitationError::NotFound`],
    /// [`AcceptInvitationError::NotPending`], or
    /// [`AcceptInvitationError::Expired`] (after marking it expired).
    pub async fn preview(&self, token: &str) -> Result<Invitation, AcceptInvitationError> {
        self.live_invitation(token).await
    }

    /// Lists a company's invitations, newest first, with lazy expiry
    /// applied to every returned row.
    ///
    /// # Errors
    ///
    /// Returns [`ListInvitationsError::Unauthorized`] unless the actor
    /// administers the company.
    pub async fn list_for_company(
        &self,
        actor: UserId,
        company_id: CompanyId,
    ) -> Result<Vec<Invitation>, ListInvitationsError> {
        if !self
            .resolver
            .can_administer_company(actor, company_id)
            .await?
        {
            let err = ListInvitationsError::Unauthorized {
                user_id: actor,
                company_id,
            };
            warn!(reason = err.reason_code(), error = %err, "invitation listing refused");
            return Err(err);
        }

        let now = self.clock.utc();
        let listed = self.repository.list_for_company(company_id).await?;
        let mut invitations = Vec::with_capacity(listed.len());
        for mut invitation in listed {
            if invitation.has_lapsed(now) {
                self.repository.mark_expired(invitation.id(), now).await?;
                if let Some(fresh) = self.repository.find_by_id(invitation.id()).await? {
                    invitation = fresh;
                }
            }
            invitations.push(invitation);
        }
        Ok(invitations)
    }

    /// A placed user may have been placed by a concurrent accept of this
    /// very invitation; that caller lost the race and sees `NotPending`.
    async fn refusal_for_placed_user(
        &self,
        invitation: &Invitation,
        user_id: UserId,
    ) -> AcceptInvitationError {
        match self.repository.find_by_id(invitation.id()).await {
            Ok(Some(current)) if current.status() != InvitationStatus::Pending => {
                refused_accept(AcceptInvitationError::NotPending(current.status()))
            }
            Ok(_) => refused_accept(AcceptInvitationError::AlreadyInCompany(user_id)),
            Err(err) => AcceptInvitationError::Repository(err),
        }
    }

    async fn live_invitation(&self, token: &str) -> Result<Invitation, AcceptInvitationError> {
        let Ok(presented) = InvitationToken::new(token) else {
            return Err(refused_accept(AcceptInvitationError::NotFound));
        };
        let Some(invitation) = self.repository.find_by_token(&presented.digest()).await? else {
            return Err(refused_accept(AcceptInvitationError::NotFound));
        };
        if invitation.status() != InvitationStatus::Pending {
            return Err(refused_accept(AcceptInvitationError::NotPending(
                invitation.status(),
            )));
        }
        let now = self.clock.utc();
        if invitation.has_lapsed(now) {
            let flipped = self.repository.mark_expired(invitation.id(), now).await?;
            debug!(invitation_id = %invitation.id(), flipped, "invitation lapsed on read");
            return Err(refused_accept(AcceptInvitationError::Expired(
                invitation.expires_at(),
            )));
        }
        Ok(invitation)
    }
}

fn refused_issue(err: IssueInvitationError) -> IssueInvitationError {
    warn!(reason = err.reason_code(), error = %err, "invitation issue refused");
    err
}

fn refused_accept(err: AcceptInvitationError) -> AcceptInvitationError {
    warn!(reason = err.reason_code(), error = %err, "invitation acceptance refused");
    err
}
