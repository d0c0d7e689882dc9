//! Diesel schema for tenancy persistence.

diesel::table! {
    /// Registered users and their tenancy placement.
    users (id) {
        /// Internal user identifier.
        id -> Uuid,
        /// Display name.
        #[max_length = 100]
        username -> Varchar,
        /// Lower-cased email address, unique.
        #[max_length = 255]
        email -> Varchar,
        /// System role (`platform_admin`, `company_admin`, `member`).
        #[max_length = 50]
        role -> Varchar,
        /// Company the user belongs to.
        company_id -> Nullable<Uuid>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tenants.
    companies (id) {
        /// Internal company identifier.
        id -> Uuid,
        /// Company name.
        #[max_length = 255]
        name -> Varchar,
        /// Owning user.
        owner_id -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Boards scoped to exactly one company.
    boards (id) {
        /// Internal board identifier.
        id -> Uuid,
        /// Owning company.
        company_id -> Uuid,
        /// Board name.
        #[max_length = 255]
        name -> Varchar,
        /// Creating user.
        created_by -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Explicit board memberships.
    board_memberships (board_id, user_id) {
        /// Board of the membership.
        board_id -> Uuid,
        /// Member.
        user_id -> Uuid,
        /// Board role (`board_viewer`, `board_editor`, `board_admin`).
        #[max_length = 50]
        role -> Varchar,
        /// Grant timestamp.
        granted_at -> Timestamptz,
    }
}

diesel::table! {
    /// Company invitations.
    invitations (id) {
        /// Internal invitation identifier.
        id -> Uuid,
        /// Target company.
        company_id -> Uuid,
        /// Lower-cased target email.
        #[max_length = 255]
        email -> Varchar,
        /// Hex SHA-256 digest of the token.
        #[max_length = 64]
        token_digest -> Varchar,
        /// Lifecycle status (`pending`, `accepted`, `expired`).
        #[max_length = 50]
        status -> Varchar,
        /// Issuing user.
        issued_by -> Uuid,
        /// Expiry timestamp.
        expires_at -> Timestamptz,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last status change timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(boards -> companies (company_id));
diesel::joinable!(board_memberships -> boards (board_id));
diesel::joinable!(board_memberships -> users (user_id));
diesel::joinable!(invitations -> companies (company_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    companies,
    boards,
    board_memberships,
    invitations,
);
