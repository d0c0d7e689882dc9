//! In-memory invitation repository on the shared workspace store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;

use crate::invitation::{
    domain::{Invitation, InvitationId, InvitationStatus, TokenDigest},
    ports::{
        InvitationAcceptance, InvitationRepository, InvitationRepositoryError,
        InvitationRepositoryResult,
    },
};
use crate::tenancy::{
    adapters::memory::InMemoryWorkspaceStore,
    domain::{CompanyId, EmailAddress},
};

#[async_trait]
impl InvitationRepository for InMemoryWorkspaceStore {
    async fn insert_pending(&self, invitation: &Invitation) -> InvitationRepositoryResult<()> {
        let mut state = self
            .write_state()
            .map_err(InvitationRepositoryError::persistence)?;

        if state.invitations.contains_key(&invitation.id())
            || state.token_index.contains_key(invitation.token_digest())
        {
            return Err(InvitationRepositoryError::DuplicateInvitation(
                invitation.id(),
            ));
        }
        let has_pending = state.invitations.values().any(|existing| {
            existing.status() == InvitationStatus::Pending
                && existing.company_id() == invitation.company_id()
                && existing.email() == invitation.email()
        });
        if has_pending {
            return Err(InvitationRepositoryError::DuplicatePending {
                company_id: invitation.company_id(),
                email: invitation.email().clone(),
            });
        }

        state
            .token_index
            .insert(invitation.token_digest().clone(), invitation.id());
        state.invitations.insert(invitation.id(), invitation.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: InvitationId,
    ) -> InvitationRepositoryResult<Option<Invitation>> {
        let state = self
            .read_state()
            .map_err(InvitationRepositoryError::persistence)?;
        Ok(state.invitations.get(&id).cloned())
    }

    async fn find_by_token(
        &self,
        digest: &TokenDigest,
    ) -> InvitationRepositoryResult<Option<Invitation>> {
        let state = self
            .read_state()
            .map_err(InvitationRepositoryError::persistence)?;
        let invitation = state
            .token_index
            .get(digest)
            .and_then(|id| state.invitations.get(id))
            .cloned();
        Ok(invitation)
    }

    async fn find_pending(
        &self,
        company_id: CompanyId,
        email: &EmailAddress,
    ) -> InvitationRepositoryResult<Option<Invitation>> {
        let state = self
            .read_state()
            .map_err(InvitationRepositoryError::persistence)?;
        let invitation = state
            .invitations
            .values()
            .find(|invitation| {
                invitation.status() == InvitationStatus::Pending
                    && invitation.company_id() == company_id
                    && invitation.email() == email
            })
            .cloned();
        Ok(invitation)
    }

    async fn list_for_company(
        &self,
        company_id: CompanyId,
    ) -> InvitationRepositoryResult<Vec<Invitation>> {
        let state = self
            .read_state()
            .map_err(InvitationRepositoryError::persistence)?;
        let mut invitations: Vec<Invitation> = state
            .invitations
            .values()
            .filter(|invitation| invitation.company_id() == company_id)
            .cloned()
            .collect();
        invitations.sort_by_key(|invitation| Reverse(invitation.created_at()));
        Ok(invitations)
    }

    async fn mark_expired(
        &self,
        id: InvitationId,
        at: DateTime<Utc>,
    ) -> InvitationRepositoryResult<bool> {
        let mut state = self
            .write_state()
            .map_err(InvitationRepositoryError::persistence)?;
        let invitation = state
            .invitations
            .get_mut(&id)
            .ok_or(InvitationRepositoryError::NotFound(id))?;
        if invitation.status() != InvitationStatus::Pending {
            return Ok(false);
        }
        invitation
            .transition_to(InvitationStatus::Expired, at)
            .map_err(InvitationRepositoryError::persistence)?;
        Ok(true)
    }

    async fn accept(
        &self,
        acceptance: &InvitationAcceptance,
    ) -> InvitationRepositoryResult<Invitation> {
        let id = acceptance.invitation_id;
        let mut state = self
            .write_state()
            .map_err(InvitationRepositoryError::persistence)?;

        let invitation = state
            .invitations
            .get_mut(&id)
            .ok_or(InvitationRepositoryError::NotFound(id))?;
        let status = invitation.status();
        if status != InvitationStatus::Pending {
            return Err(InvitationRepositoryError::NotPending { id, status });
        }
        if invitation.has_lapsed(acceptance.at) {
            invitation
                .transition_to(InvitationStatus::Expired, acceptance.at)
                .map_err(InvitationRepositoryError::persistence)?;
            return Err(InvitationRepositoryError::Lapsed {
                id,
                expires_at: invitation.expires_at(),
            });
        }

        // Validates every tenancy invariant before mutating anything.
        state.apply_transition(&acceptance.transition)?;

        let invitation = state
            .invitations
            .get_mut(&id)
            .ok_or(InvitationRepositoryError::NotFound(id))?;
        invitation
            .transition_to(InvitationStatus::Accepted, acceptance.at)
            .map_err(InvitationRepositoryError::persistence)?;
        Ok(invitation.clone())
    }
}
