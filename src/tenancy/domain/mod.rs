//! Domain model for tenancy: users, companies, boards, and memberships.
//!
//! The tenancy domain holds the entity graph and the role vocabulary. It
//! plans state changes but never persists them; invariants spanning several
//! rows are enforced by the store port in [`crate::tenancy::ports`].

mod company;
mod email;
mod error;
mod ids;
mod membership;
mod role;
mod transition;
mod user;

pub use company::{Board, Company};
pub use email::EmailAddress;
pub use error::{ParseRoleError, TenancyDomainError};
pub use ids::{BoardId, CompanyId, UserId};
pub use membership::BoardMembership;
pub use role::{BoardRole, SystemRole};
pub use transition::CompanyTransition;
pub use user::{PersistedUserData, User};
