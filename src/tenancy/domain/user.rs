//! User aggregate.

use super::{CompanyId, EmailAddress, SystemRole, TenancyDomainError, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A registered user and their tenancy placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    email: EmailAddress,
    role: SystemRole,
    company_id: Option<CompanyId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedUserData {
    /// Persisted user identifier.
    pub id: UserId,
    /// Persisted display name.
    pub username: String,
    /// Persisted normalised email.
    pub email: EmailAddress,
    /// Persisted system role.
    pub role: SystemRole,
    /// Persisted company placement.
    pub company_id: Option<CompanyId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Registers a new user with the given system role and no company.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyDomainError::EmptyUsername`] when the username is
    /// blank.
    pub fn register(
        username: impl Into<String>,
        email: EmailAddress,
        role: SystemRole,
        clock: &impl Clock,
    ) -> Result<Self, TenancyDomainError> {
        let raw = username.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TenancyDomainError::EmptyUsername);
        }
        // A company admin always belongs to a company; registration has none.
        let initial_role = if role.is_company_admin() {
            SystemRole::Member
        } else {
            role
        };
        let timestamp = clock.utc();
        Ok(Self {
            id: UserId::new(),
            username: trimmed.to_owned(),
            email,
            role: initial_role,
            company_id: None,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a user from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedUserData) -> Self {
        Self {
            id: data.id,
            username: data.username,
            email: data.email,
            role: data.role,
            company_id: data.company_id,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the normalised email address.
    #[must_use]
    pub const fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the system role.
    #[must_use]
    pub const fn role(&self) -> SystemRole {
        self.role
    }

    /// Returns the company the user belongs to, if any.
    #[must_use]
    pub const fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when the user is a platform administrator.
    #[must_use]
    pub const fn is_platform_admin(&self) -> bool {
        self.role.is_platform_admin()
    }

    /// Returns `true` when the user belongs to `company_id`.
    #[must_use]
    pub fn belongs_to(&self, company_id: CompanyId) -> bool {
        self.company_id == Some(company_id)
    }

    /// Returns `true` when the user is the company admin of `company_id`.
    #[must_use]
    pub fn administers(&self, company_id: CompanyId) -> bool {
        self.role.is_company_admin() && self.belongs_to(company_id)
    }

    /// Writes a new placement.
    ///
    /// Only tenancy store adapters call this, after checking the invariants
    /// of the surrounding transition.
    pub const fn place(
        &mut self,
        company_id: Option<CompanyId>,
        role: SystemRole,
        at: DateTime<Utc>,
    ) {
        self.company_id = company_id;
        self.role = role;
        self.updated_at = at;
    }
}
