//! Diesel row models for tenancy persistence.

use super::schema::{board_memberships, boards, companies, invitations, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Row of the `users` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    /// Internal user identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub username: String,
    /// Lower-cased email address.
    pub email: String,
    /// System role.
    pub role: String,
    /// Company placement.
    pub company_id: Option<uuid::Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row of the `companies` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = companies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CompanyRow {
    /// Internal company identifier.
    pub id: uuid::Uuid,
    /// Company name.
    pub name: String,
    /// Owning user.
    pub owner_id: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Row of the `boards` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = boards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BoardRow {
    /// Internal board identifier.
    pub id: uuid::Uuid,
    /// Owning company.
    pub company_id: uuid::Uuid,
    /// Board name.
    pub name: String,
    /// Creating user.
    pub created_by: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Row of the `board_memberships` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = board_memberships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MembershipRow {
    /// Board of the membership.
    pub board_id: uuid::Uuid,
    /// Member.
    pub user_id: uuid::Uuid,
    /// Board role.
    pub role: String,
    /// Grant timestamp.
    pub granted_at: DateTime<Utc>,
}

/// Row of the `invitations` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = invitations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InvitationRow {
    /// Internal invitation identifier.
    pub id: uuid::Uuid,
    /// Target company.
    pub company_id: uuid::Uuid,
    /// Lower-cased target email.
    pub email: String,
    /// Token digest.
    pub token_digest: String,
    /// Lifecycle status.
    pub status: String,
    /// Issuing user.
    pub issued_by: uuid::Uuid,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status change timestamp.
    pub updated_at: DateTime<Utc>,
}
