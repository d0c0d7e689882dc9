//! Company and board entities.
//!
//! A company is the tenancy root; boards belong to exactly one company and
//! are never shared.

use super::{BoardId, CompanyId, TenancyDomainError, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A tenant organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    id: CompanyId,
    name: String,
    owner: UserId,
    created_at: DateTime<Utc>,
}

impl Company {
    /// Creates a company owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyDomainError::EmptyCompanyName`] when the name is
    /// blank.
    pub fn new(
        name: impl Into<String>,
        owner: UserId,
        clock: &impl Clock,
    ) -> Result<Self, TenancyDomainError> {
        let company_name = non_blank(name.into()).ok_or(TenancyDomainError::EmptyCompanyName)?;
        Ok(Self {
            id: CompanyId::new(),
            name: company_name,
            owner,
            created_at: clock.utc(),
        })
    }

    /// Reconstructs a company from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: CompanyId,
        name: String,
        owner: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            owner,
            created_at,
        }
    }

    /// Returns the company identifier.
    #[must_use]
    pub const fn id(&self) -> CompanyId {
        self.id
    }

    /// Returns the company name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A board inside a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    id: BoardId,
    company_id: CompanyId,
    name: String,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Board {
    /// Creates a board in `company_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyDomainError::EmptyBoardName`] when the name is
    /// blank.
    pub fn new(
        company_id: CompanyId,
        name: impl Into<String>,
        created_by: UserId,
        clock: &impl Clock,
    ) -> Result<Self, TenancyDomainError> {
        let board_name = non_blank(name.into()).ok_or(TenancyDomainError::EmptyBoardName)?;
        Ok(Self {
            id: BoardId::new(),
            company_id,
            name: board_name,
            created_by,
            created_at: clock.utc(),
        })
    }

    /// Reconstructs a board from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: BoardId,
        company_id: CompanyId,
        name: String,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            company_id,
            name,
            created_by,
            created_at,
        }
    }

    /// Returns the board identifier.
    #[must_use]
    pub const fn id(&self) -> BoardId {
        self.id
    }

    /// Returns the owning company.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the board name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the creating user.
    #[must_use]
    pub const fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
