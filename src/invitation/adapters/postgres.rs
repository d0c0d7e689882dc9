//! `PostgreSQL` invitation repository on the shared workspace store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::invitation::{
    domain::{
        Invitation, InvitationId, InvitationStatus, PersistedInvitationData, TokenDigest,
    },
    ports::{
        InvitationAcceptance, InvitationRepository, InvitationRepositoryError,
        InvitationRepositoryResult,
    },
};
use crate::tenancy::{
    adapters::postgres::{
        PostgresWorkspaceStore, apply_transition_tx, models::InvitationRow, schema::invitations,
    },
    domain::{CompanyId, EmailAddress, UserId},
};

const PENDING_UNIQUE_INDEX: &str = "idx_invitations_pending_company_email";

impl From<DieselError> for InvitationRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl InvitationRepository for PostgresWorkspaceStore {
    async fn insert_pending(&self, invitation: &Invitation) -> InvitationRepositoryResult<()> {
        let invitation_id = invitation.id();
        let company_id = invitation.company_id();
        let email = invitation.email().clone();
        let row = to_invitation_row(invitation);

        self.run_blocking(move |connection| {
            diesel::insert_into(invitations::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if info.constraint_name() == Some(PENDING_UNIQUE_INDEX) =>
                    {
                        InvitationRepositoryError::DuplicatePending {
                            company_id,
                            email: email.clone(),
                        }
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        InvitationRepositoryError::DuplicateInvitation(invitation_id)
                    }
                    _ => InvitationRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: InvitationId,
    ) -> InvitationRepositoryResult<Option<Invitation>> {
        self.run_blocking(move |connection| {
            let row = invitations::table
                .find(id.into_inner())
                .select(InvitationRow::as_select())
                .first::<InvitationRow>(connection)
                .optional()?;
            row.map(row_to_invitation).transpose()
        })
        .await
    }

    async fn find_by_token(
        &self,
        digest: &TokenDigest,
    ) -> InvitationRepositoryResult<Option<Invitation>> {
        let digest_str = digest.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = invitations::table
                .filter(invitations::token_digest.eq(&digest_str))
                .select(InvitationRow::as_select())
                .first::<InvitationRow>(connection)
                .optional()?;
            row.map(row_to_invitation).transpose()
        })
        .await
    }

    async fn find_pending(
        &self,
        company_id: CompanyId,
        email: &EmailAddress,
    ) -> InvitationRepositoryResult<Option<Invitation>> {
        let email_str = email.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = invitations::table
                .filter(invitations::company_id.eq(company_id.into_inner()))
                .filter(invitations::email.eq(&email_str))
                .filter(invitations::status.eq(InvitationStatus::Pending.as_str()))
                .select(InvitationRow::as_select())
                .first::<InvitationRow>(connection)
                .optional()?;
            row.map(row_to_invitation).transpose()
        })
        .await
    }

    async fn list_for_company(
        &self,
        company_id: CompanyId,
    ) -> InvitationRepositoryResult<Vec<Invitation>> {
        self.run_blocking(move |connection| {
            let rows = invitations::table
                .filter(invitations::company_id.eq(company_id.into_inner()))
                .order(invitations::created_at.desc())
                .select(InvitationRow::as_select())
                .load::<InvitationRow>(connection)?;
            rows.into_iter().map(row_to_invitation).collect()
        })
        .await
    }

    async fn mark_expired(
        &self,
        id: InvitationId,
        at: DateTime<Utc>,
    ) -> InvitationRepositoryResult<bool> {
        self.run_blocking(move |connection| {
            let updated = transition_if_pending(connection, id, InvitationStatus::Expired, at)?;
            if updated > 0 {
                return Ok(true);
            }
            current_status(connection, id).map(|_| false)
        })
        .await
    }

    async fn accept(
        &self,
        acceptance: &InvitationAcceptance,
    ) -> InvitationRepositoryResult<Invitation> {
        let planned = *acceptance;
        self.run_blocking(move |connection| {
            let outcome = connection.transaction::<_, InvitationRepositoryError, _>(|tx| {
                let id = planned.invitation_id;
                let current = invitations::table
                    .find(id.into_inner())
                    .select(InvitationRow::as_select())
                    .for_update()
                    .first::<InvitationRow>(tx)
                    .optional()?
                    .ok_or(InvitationRepositoryError::NotFound(id))
                    .and_then(row_to_invitation)?;
                if current.status() != InvitationStatus::Pending {
                    return Err(InvitationRepositoryError::NotPending {
                        id,
                        status: current.status(),
                    });
                }
                if current.has_lapsed(planned.at) {
                    transition_if_pending(tx, id, InvitationStatus::Expired, planned.at)?;
                    return Ok(AcceptOutcome::Lapsed(current.expires_at()));
                }

                let updated =
                    transition_if_pending(tx, id, InvitationStatus::Accepted, planned.at)?;
                if updated == 0 {
                    let status = current_status(tx, id)?;
                    return Err(InvitationRepositoryError::NotPending { id, status });
                }
                apply_transition_tx(tx, &planned.transition)?;
                let row = invitations::table
                    .find(id.into_inner())
                    .select(InvitationRow::as_select())
                    .first::<InvitationRow>(tx)?;
                row_to_invitation(row).map(AcceptOutcome::Accepted)
            })?;
            match outcome {
                AcceptOutcome::Accepted(invitation) => Ok(invitation),
                AcceptOutcome::Lapsed(expires_at) => Err(InvitationRepositoryError::Lapsed {
                    id: planned.invitation_id,
                    expires_at,
                }),
            }
        })
        .await
    }
}

/// Result of the accept transaction. A lapsed invitation is committed as
/// `expired` before the refusal is reported.
enum AcceptOutcome {
    Accepted(Invitation),
    Lapsed(DateTime<Utc>),
}

/// Compare-and-set of the status column; returns the number of rows changed.
fn transition_if_pending(
    connection: &mut PgConnection,
    id: InvitationId,
    next: InvitationStatus,
    at: DateTime<Utc>,
) -> InvitationRepositoryResult<usize> {
    let updated = diesel::update(
        invitations::table
            .find(id.into_inner())
            .filter(invitations::status.eq(InvitationStatus::Pending.as_str())),
    )
    .set((
        invitations::status.eq(next.as_str()),
        invitations::updated_at.eq(at),
    ))
    .execute(connection)?;
    Ok(updated)
}

fn current_status(
    connection: &mut PgConnection,
    id: InvitationId,
) -> InvitationRepositoryResult<InvitationStatus> {
    let status = invitations::table
        .find(id.into_inner())
        .select(invitations::status)
        .first::<String>(connection)
        .optional()?
        .ok_or(InvitationRepositoryError::NotFound(id))?;
    InvitationStatus::try_from(status.as_str()).map_err(InvitationRepositoryError::persistence)
}

fn to_invitation_row(invitation: &Invitation) -> InvitationRow {
    InvitationRow {
        id: invitation.id().into_inner(),
        company_id: invitation.company_id().into_inner(),
        email: invitation.email().as_str().to_owned(),
        token_digest: invitation.token_digest().as_str().to_owned(),
        status: invitation.status().as_str().to_owned(),
        issued_by: invitation.issued_by().into_inner(),
        expires_at: invitation.expires_at(),
        created_at: invitation.created_at(),
        updated_at: invitation.updated_at(),
    }
}

fn row_to_invitation(row: InvitationRow) -> InvitationRepositoryResult<Invitation> {
    let InvitationRow {
        id,
        company_id,
        email,
        token_digest,
        status,
        issued_by,
        expires_at,
        created_at,
        updated_at,
    } = row;

    let parsed_email = EmailAddress::new(email).map_err(InvitationRepositoryError::persistence)?;
    let parsed_status =
        InvitationStatus::try_from(status.as_str()).map_err(InvitationRepositoryError::persistence)?;
    Ok(Invitation::from_persisted(PersistedInvitationData {
        id: InvitationId::from_uuid(id),
        company_id: CompanyId::from_uuid(company_id),
        email: parsed_email,
        token_digest: TokenDigest::from_persisted(token_digest),
        status: parsed_status,
        issued_by: UserId::from_uuid(issued_by),
        expires_at,
        created_at,
        updated_at,
    }))
}
