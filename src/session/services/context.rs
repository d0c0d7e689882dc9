//! Active board selection and revalidation.

use crate::authz::{
    domain::{Principal, RequiredRoles},
    services::PermissionResolver,
};
use crate::error::{Classified, ErrorKind};
use crate::session::{
    domain::SessionContext,
    ports::{SessionStore, SessionStoreError},
};
use crate::tenancy::{
    domain::{BoardId, UserId},
    ports::{TenancyRepository, TenancyRepositoryError},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by [`SessionContextService`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The user does not exist.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(UserId),

    /// The board does not exist.
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),

    /// The user holds no access to the board.
    #[error("user {user_id} has no access to board {board_id}")]
    Unauthorized {
        /// Requesting user.
        user_id: UserId,
        /// Requested board.
        board_id: BoardId,
    },

    /// The tenancy store failed.
    #[error(transparent)]
    Tenancy(#[from] TenancyRepositoryError),

    /// The session store failed.
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

impl Classified for SessionError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownPrincipal(_) | Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::BoardNotFound(_) => ErrorKind::NotFound,
            Self::Tenancy(err) => err.kind(),
            Self::Store(_) => ErrorKind::Infrastructure,
        }
    }

    fn reason_code(&self) -> &'static str {
        match self {
            Self::UnknownPrincipal(_) => "unknown_principal",
            Self::BoardNotFound(_) => "board_not_found",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Tenancy(err) => err.reason_code(),
            Self::Store(_) => "session_store",
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Tracks which board each principal is working in.
#[derive(Clone)]
pub struct SessionContextService<R, S>
where
    R: TenancyRepository,
    S: SessionStore,
{
    repository: Arc<R>,
    resolver: PermissionResolver<R>,
    store: Arc<S>,
}

impl<R, S> SessionContextService<R, S>
where
    R: TenancyRepository,
    S: SessionStore,
{
    /// Creates a session service.
    #[must_use]
    pub fn new(repository: Arc<R>, store: Arc<S>) -> Self {
        let resolver = PermissionResolver::new(Arc::clone(&repository));
        Self {
            repository,
            resolver,
            store,
        }
    }

    /// Starts a session in the user's own company.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownPrincipal`] for unknown users.
    pub async fn begin(&self, user_id: UserId) -> SessionResult<SessionContext> {
        let principal = self.load_principal(user_id).await?;
        let context = SessionContext::new(user_id, principal.company_id());
        self.store.save(&context).await?;
        debug!(user_id = %user_id, "session started");
        Ok(context)
    }

    /// Makes `board_id` the active board of `user_id`.
    ///
    /// A platform admin selecting another company's board gets a
    /// cross-tenant view; its own company placement is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BoardNotFound`] for unknown boards and
    /// [`SessionError::Unauthorized`] when the user holds no access.
    pub async fn set_active_board(
        &self,
        user_id: UserId,
        board_id: BoardId,
    ) -> SessionResult<SessionContext> {
        let Some(board) = self.repository.find_board(board_id).await? else {
            warn!(user_id = %user_id, board_id = %board_id, "active board refused: not found");
            return Err(SessionError::BoardNotFound(board_id));
        };
        let Some(principal) = self.resolver.principal(user_id).await? else {
            warn!(user_id = %user_id, board_id = %board_id, "active board refused: unknown principal");
            return Err(SessionError::Unauthorized { user_id, board_id });
        };
        if !self
            .resolver
            .permits(&principal, board_id, &RequiredRoles::ANY_MEMBER)
            .await?
        {
            warn!(user_id = %user_id, board_id = %board_id, "active board refused: no access");
            return Err(SessionError::Unauthorized { user_id, board_id });
        }

        let mut context = self
            .store
            .load(user_id)
            .await?
            .unwrap_or_else(|| SessionContext::new(user_id, principal.company_id()));
        context.select_board(board_id, board.company_id(), principal.company_id());
        self.store.save(&context).await?;
        info!(
            user_id = %user_id,
            board_id = %board_id,
            cross_tenant = context.is_cross_tenant(),
            "active board selected"
        );
        Ok(context)
    }

    /// Returns the stored active board. This is a pointer, not a grant.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] when the session store fails.
    pub async fn get_active_board(&self, user_id: UserId) -> SessionResult<Option<BoardId>> {
        let context = self.store.load(user_id).await?;
        Ok(context.and_then(|ctx| ctx.active_board_id()))
    }

    /// Re-checks the stored context against current permissions.
    ///
    /// A board the user may no longer see is cleared and the view returns to
    /// the user's own company. A context whose user vanished is dropped.
    ///
    /// # Errors
    ///
    /// Returns store errors only.
    pub async fn revalidate(&self, user_id: UserId) -> SessionResult<Option<SessionContext>> {
        let Some(mut context) = self.store.load(user_id).await? else {
            return Ok(None);
        };
        let Some(principal) = self.resolver.principal(user_id).await? else {
            self.store.clear(user_id).await?;
            debug!(user_id = %user_id, "session dropped for unknown principal");
            return Ok(None);
        };

        let still_permitted = match context.active_board_id() {
            Some(board_id) => self.board_still_permitted(&principal, board_id).await?,
            None => context.active_company_id() == principal.company_id(),
        };
        if !still_permitted {
            context.reset(principal.company_id());
            self.store.save(&context).await?;
            info!(user_id = %user_id, "session context reset after revalidation");
        }
        Ok(Some(context))
    }

    /// Ends the session. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] when the session store fails.
    pub async fn end(&self, user_id: UserId) -> SessionResult<bool> {
        let existed = self.store.clear(user_id).await?;
        debug!(user_id = %user_id, existed, "session ended");
        Ok(existed)
    }

    async fn board_still_permitted(
        &self,
        principal: &Principal,
        board_id: BoardId,
    ) -> SessionResult<bool> {
        let permitted = self
            .resolver
            .permits(principal, board_id, &RequiredRoles::ANY_MEMBER)
            .await?;
        Ok(permitted)
    }

    async fn load_principal(&self, user_id: UserId) -> SessionResult<Principal> {
        self.resolver
            .principal(user_id)
            .await?
            .ok_or(SessionError::UnknownPrincipal(user_id))
    }
}
