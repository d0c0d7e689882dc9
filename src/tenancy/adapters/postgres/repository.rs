//! `PostgreSQL` tenancy store.
//!
//! Every multi-row operation runs inside one transaction. Invariant checks
//! that count rows (last platform admin, last company admin) lock the rows
//! they count with `SELECT ... FOR UPDATE` so that concurrent demotions are
//! serialised.

use super::{
    models::{BoardRow, CompanyRow, MembershipRow, UserRow},
    schema::{board_memberships, boards, companies, users},
};
use crate::tenancy::{
    domain::{
        Board, BoardId, BoardMembership, BoardRole, Company, CompanyId, CompanyTransition,
        EmailAddress, PersistedUserData, SystemRole, User, UserId,
    },
    ports::{TenancyRepository, TenancyRepositoryError, TenancyRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by the workspace store.
pub type WorkspacePgPool = Pool<ConnectionManager<PgConnection>>;

const EMAIL_UNIQUE_INDEX: &str = "idx_users_email";

/// `PostgreSQL`-backed store for the tenancy graph and invitations.
#[derive(Debug, Clone)]
pub struct PostgresWorkspaceStore {
    pool: WorkspacePgPool,
}

impl PostgresWorkspaceStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: WorkspacePgPool) -> Self {
        Self { pool }
    }

    /// Runs `f` on a pooled connection on the blocking thread pool.
    pub(crate) async fn run_blocking<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<TenancyRepositoryError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(|err| E::from(TenancyRepositoryError::persistence(err)))?;
            f(&mut connection)
        })
        .await
        .map_err(|err| E::from(TenancyRepositoryError::persistence(err)))?
    }
}

impl From<DieselError> for TenancyRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl TenancyRepository for PostgresWorkspaceStore {
    async fn insert_user(&self, user: &User) -> TenancyRepositoryResult<()> {
        let user_id = user.id();
        let email = user.email().clone();
        let row = to_user_row(user);

        self.run_blocking(move |connection| {
            diesel::insert_into(users::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if info.constraint_name() == Some(EMAIL_UNIQUE_INDEX) =>
                    {
                        TenancyRepositoryError::DuplicateEmail(email.clone())
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TenancyRepositoryError::DuplicateUser(user_id)
                    }
                    _ => TenancyRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_user(&self, id: UserId) -> TenancyRepositoryResult<Option<User>> {
        self.run_blocking(move |connection| {
            let row = users::table
                .find(id.into_inner())
                .select(UserRow::as_select())
                .first::<UserRow>(connection)
                .optional()?;
            row.map(row_to_user).transpose()
        })
        .await
    }

    async fn find_user_by_email(
        &self,
        email: &EmailAddress,
    ) -> TenancyRepositoryResult<Option<User>> {
        let email_str = email.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = users::table
                .filter(users::email.eq(&email_str))
                .select(UserRow::as_select())
                .first::<UserRow>(connection)
                .optional()?;
            row.map(row_to_user).transpose()
        })
        .await
    }

    async fn find_company(&self, id: CompanyId) -> TenancyRepositoryResult<Option<Company>> {
        self.run_blocking(move |connection| {
            let row = companies::table
                .find(id.into_inner())
                .select(CompanyRow::as_select())
                .first::<CompanyRow>(connection)
                .optional()?;
            Ok(row.map(row_to_company))
        })
        .await
    }

    async fn find_board(&self, id: BoardId) -> TenancyRepositoryResult<Option<Board>> {
        self.run_blocking(move |connection| {
            let row = boards::table
                .find(id.into_inner())
                .select(BoardRow::as_select())
                .first::<BoardRow>(connection)
                .optional()?;
            Ok(row.map(row_to_board))
        })
        .await
    }

    async fn find_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> TenancyRepositoryResult<Option<BoardMembership>> {
        self.run_blocking(move |connection| {
            let row = board_memberships::table
                .find((board_id.into_inner(), user_id.into_inner()))
                .select(MembershipRow::as_select())
                .first::<MembershipRow>(connection)
                .optional()?;
            row.map(row_to_membership).transpose()
        })
        .await
    }

    async fn list_memberships_for_user(
        &self,
        user_id: UserId,
    ) -> TenancyRepositoryResult<Vec<BoardMembership>> {
        self.run_blocking(move |connection| {
            let rows = board_memberships::table
                .filter(board_memberships::user_id.eq(user_id.into_inner()))
                .order(board_memberships::granted_at.asc())
                .select(MembershipRow::as_select())
                .load::<MembershipRow>(connection)?;
            rows.into_iter().map(row_to_membership).collect()
        })
        .await
    }

    async fn list_boards_for_company(
        &self,
        company_id: CompanyId,
    ) -> TenancyRepositoryResult<Vec<Board>> {
        self.run_blocking(move |connection| {
            let rows = boards::table
                .filter(boards::company_id.eq(company_id.into_inner()))
                .order((boards::name.asc(), boards::id.asc()))
                .select(BoardRow::as_select())
                .load::<BoardRow>(connection)?;
            Ok(rows.into_iter().map(row_to_board).collect())
        })
        .await
    }

    async fn create_company(
        &self,
        company: &Company,
        owner_transition: Option<&CompanyTransition>,
    ) -> TenancyRepositoryResult<()> {
        let company_id = company.id();
        let owner = company.owner();
        let row = to_company_row(company);
        let transition = owner_transition.copied();

        self.run_blocking(move |connection| {
            connection.transaction::<_, TenancyRepositoryError, _>(|tx| {
                if !user_exists(tx, owner)? {
                    return Err(TenancyRepositoryError::UserNotFound(owner));
                }
                diesel::insert_into(companies::table)
                    .values(&row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            TenancyRepositoryError::DuplicateCompany(company_id)
                        }
                        _ => TenancyRepositoryError::persistence(err),
                    })?;
                if let Some(planned) = transition {
                    apply_transition_tx(tx, &planned)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn create_board(
        &self,
        board: &Board,
        creator: Option<&BoardMembership>,
    ) -> TenancyRepositoryResult<()> {
        let board_id = board.id();
        let company_id = board.company_id();
        let board_row = to_board_row(board);
        let membership_row = creator.map(to_membership_row);

        self.run_blocking(move |connection| {
            connection.transaction::<_, TenancyRepositoryError, _>(|tx| {
                let company_count: i64 = companies::table
                    .find(company_id.into_inner())
                    .count()
                    .get_result(tx)?;
                if company_count == 0 {
                    return Err(TenancyRepositoryError::CompanyNotFound(company_id));
                }
                if let Some(row) = &membership_row {
                    let creator_id = UserId::from_uuid(row.user_id);
                    if locked_user_company(tx, creator_id)? != Some(company_id) {
                        return Err(TenancyRepositoryError::CrossTenantMembership {
                            board_id,
                            user_id: creator_id,
                        });
                    }
                }
                diesel::insert_into(boards::table)
                    .values(&board_row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            TenancyRepositoryError::DuplicateBoard(board_id)
                        }
                        _ => TenancyRepositoryError::persistence(err),
                    })?;
                if let Some(row) = &membership_row {
                    diesel::insert_into(board_memberships::table)
                        .values(row)
                        .execute(tx)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn insert_membership(&self, membership: &BoardMembership) -> TenancyRepositoryResult<()> {
        let board_id = membership.board_id();
        let user_id = membership.user_id();
        let row = to_membership_row(membership);

        self.run_blocking(move |connection| {
            connection.transaction::<_, TenancyRepositoryError, _>(|tx| {
                let board_company = boards::table
                    .find(board_id.into_inner())
                    .select(boards::company_id)
                    .first::<uuid::Uuid>(tx)
                    .optional()?
                    .ok_or(TenancyRepositoryError::BoardNotFound(board_id))?;
                let user_company = locked_user_company(tx, user_id)?;
                if user_company != Some(CompanyId::from_uuid(board_company)) {
                    return Err(TenancyRepositoryError::CrossTenantMembership {
                        board_id,
                        user_id,
                    });
                }
                diesel::insert_into(board_memberships::table)
                    .values(&row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            TenancyRepositoryError::DuplicateMembership { board_id, user_id }
                        }
                        _ => TenancyRepositoryError::persistence(err),
                    })?;
                Ok(())
            })
        })
        .await
    }

    async fn update_membership(&self, membership: &BoardMembership) -> TenancyRepositoryResult<()> {
        let board_id = membership.board_id();
        let user_id = membership.user_id();
        let role = membership.role().as_str();

        self.run_blocking(move |connection| {
            let updated = diesel::update(
                board_memberships::table.find((board_id.into_inner(), user_id.into_inner())),
            )
            .set(board_memberships::role.eq(role))
            .execute(connection)?;
            if updated == 0 {
                return Err(TenancyRepositoryError::MembershipNotFound { board_id, user_id });
            }
            Ok(())
        })
        .await
    }

    async fn remove_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> TenancyRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let deleted = diesel::delete(
                board_memberships::table.find((board_id.into_inner(), user_id.into_inner())),
            )
            .execute(connection)?;
            if deleted == 0 {
                return Err(TenancyRepositoryError::MembershipNotFound { board_id, user_id });
            }
            Ok(())
        })
        .await
    }

    async fn set_system_role(
        &self,
        user_id: UserId,
        role: SystemRole,
        at: DateTime<Utc>,
    ) -> TenancyRepositoryResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, TenancyRepositoryError, _>(|tx| {
                let row = users::table
                    .find(user_id.into_inner())
                    .select(UserRow::as_select())
                    .for_update()
                    .first::<UserRow>(tx)
                    .optional()?
                    .ok_or(TenancyRepositoryError::UserNotFound(user_id))?;
                let current = SystemRole::try_from(row.role.as_str())
                    .map_err(TenancyRepositoryError::persistence)?;
                let company_id = row.company_id.map(CompanyId::from_uuid);

                if role.is_company_admin() && company_id.is_none() {
                    return Err(TenancyRepositoryError::CompanyAdminWithoutCompany(user_id));
                }
                if current.is_platform_admin()
                    && !role.is_platform_admin()
                    && locked_platform_admin_count(tx)? <= 1
                {
                    return Err(TenancyRepositoryError::LastPlatformAdmin(user_id));
                }
                if let Some(company) = company_id
                    && current.is_company_admin()
                    && !role.is_company_admin()
                    && locked_company_admin_count(tx, company)? <= 1
                {
                    return Err(TenancyRepositoryError::LastCompanyAdmin(company));
                }

                diesel::update(users::table.find(user_id.into_inner()))
                    .set((users::role.eq(role.as_str()), users::updated_at.eq(at)))
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn apply_company_transition(
        &self,
        transition: &CompanyTransition,
    ) -> TenancyRepositoryResult<usize> {
        let planned = *transition;
        self.run_blocking(move |connection| {
            connection.transaction::<_, TenancyRepositoryError, _>(|tx| {
                apply_transition_tx(tx, &planned)
            })
        })
        .await
    }
}

/// Checks and applies a company transition inside an open transaction.
pub(crate) fn apply_transition_tx(
    tx: &mut PgConnection,
    transition: &CompanyTransition,
) -> TenancyRepositoryResult<usize> {
    let user_id = transition.user_id();
    if locked_user_company(tx, user_id)? != transition.from() {
        return Err(TenancyRepositoryError::StaleCompany(user_id));
    }
    if let Some(target) = transition.to() {
        let company_count: i64 = companies::table
            .find(target.into_inner())
            .count()
            .get_result(tx)?;
        if company_count == 0 {
            return Err(TenancyRepositoryError::CompanyNotFound(target));
        }
    }
    if let Some(vacated) = transition.relinquished_administration()
        && locked_company_admin_count(tx, vacated)? <= 1
    {
        return Err(TenancyRepositoryError::LastCompanyAdmin(vacated));
    }

    let removed = transition
        .vacated_company()
        .map_or(Ok(0), |company_id| purge_memberships(tx, user_id, company_id))?;

    diesel::update(users::table.find(user_id.into_inner()))
        .set((
            users::company_id.eq(transition.to().map(CompanyId::into_inner)),
            users::role.eq(transition.role().as_str()),
            users::updated_at.eq(transition.at()),
        ))
        .execute(tx)?;
    Ok(removed)
}

fn user_exists(tx: &mut PgConnection, user_id: UserId) -> TenancyRepositoryResult<bool> {
    let count: i64 = users::table
        .find(user_id.into_inner())
        .count()
        .get_result(tx)?;
    Ok(count > 0)
}

/// Locks the user row and returns its company.
fn locked_user_company(
    tx: &mut PgConnection,
    user_id: UserId,
) -> TenancyRepositoryResult<Option<CompanyId>> {
    let company = users::table
        .find(user_id.into_inner())
        .select(users::company_id)
        .for_update()
        .first::<Option<uuid::Uuid>>(tx)
        .optional()?
        .ok_or(TenancyRepositoryError::UserNotFound(user_id))?;
    Ok(company.map(CompanyId::from_uuid))
}

fn locked_company_admin_count(
    tx: &mut PgConnection,
    company_id: CompanyId,
) -> TenancyRepositoryResult<usize> {
    let admins = users::table
        .filter(users::company_id.eq(company_id.into_inner()))
        .filter(users::role.eq(SystemRole::CompanyAdmin.as_str()))
        .select(users::id)
        .for_update()
        .load::<uuid::Uuid>(tx)?;
    Ok(admins.len())
}

fn locked_platform_admin_count(tx: &mut PgConnection) -> TenancyRepositoryResult<usize> {
    let admins = users::table
        .filter(users::role.eq(SystemRole::PlatformAdmin.as_str()))
        .select(users::id)
        .for_update()
        .load::<uuid::Uuid>(tx)?;
    Ok(admins.len())
}

fn purge_memberships(
    tx: &mut PgConnection,
    user_id: UserId,
    company_id: CompanyId,
) -> TenancyRepositoryResult<usize> {
    let company_boards = boards::table
        .filter(boards::company_id.eq(company_id.into_inner()))
        .select(boards::id);
    let removed = diesel::delete(
        board_memberships::table
            .filter(board_memberships::user_id.eq(user_id.into_inner()))
            .filter(board_memberships::board_id.eq_any(company_boards)),
    )
    .execute(tx)?;
    Ok(removed)
}

fn to_user_row(user: &User) -> UserRow {
    UserRow {
        id: user.id().into_inner(),
        username: user.username().to_owned(),
        email: user.email().as_str().to_owned(),
        role: user.role().as_str().to_owned(),
        company_id: user.company_id().map(CompanyId::into_inner),
        created_at: user.created_at(),
        updated_at: user.updated_at(),
    }
}

fn to_company_row(company: &Company) -> CompanyRow {
    CompanyRow {
        id: company.id().into_inner(),
        name: company.name().to_owned(),
        owner_id: company.owner().into_inner(),
        created_at: company.created_at(),
    }
}

fn to_board_row(board: &Board) -> BoardRow {
    BoardRow {
        id: board.id().into_inner(),
        company_id: board.company_id().into_inner(),
        name: board.name().to_owned(),
        created_by: board.created_by().into_inner(),
        created_at: board.created_at(),
    }
}

fn to_membership_row(membership: &BoardMembership) -> MembershipRow {
    MembershipRow {
        board_id: membership.board_id().into_inner(),
        user_id: membership.user_id().into_inner(),
        role: membership.role().as_str().to_owned(),
        granted_at: membership.granted_at(),
    }
}

fn row_to_user(row: UserRow) -> TenancyRepositoryResult<User> {
    let UserRow {
        id,
        username,
        email,
        role,
        company_id,
        created_at,
        updated_at,
    } = row;

    let parsed_email = EmailAddress::new(email).map_err(TenancyRepositoryError::persistence)?;
    let parsed_role =
        SystemRole::try_from(role.as_str()).map_err(TenancyRepositoryError::persistence)?;
    Ok(User::from_persisted(PersistedUserData {
        id: UserId::from_uuid(id),
        username,
        email: parsed_email,
        role: parsed_role,
        company_id: company_id.map(CompanyId::from_uuid),
        created_at,
        updated_at,
    }))
}

fn row_to_company(row: CompanyRow) -> Company {
    Company::from_persisted(
        CompanyId::from_uuid(row.id),
        row.name,
        UserId::from_uuid(row.owner_id),
        row.created_at,
    )
}

fn row_to_board(row: BoardRow) -> Board {
    Board::from_persisted(
        BoardId::from_uuid(row.id),
        CompanyId::from_uuid(row.company_id),
        row.name,
        UserId::from_uuid(row.created_by),
        row.created_at,
    )
}

fn row_to_membership(row: MembershipRow) -> TenancyRepositoryResult<BoardMembership> {
    let role = BoardRole::try_from(row.role.as_str()).map_err(TenancyRepositoryError::persistence)?;
    Ok(BoardMembership::from_persisted(
        BoardId::from_uuid(row.board_id),
        UserId::from_uuid(row.user_id),
        role,
        row.granted_at,
    ))
}
