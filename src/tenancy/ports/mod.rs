//! Port contracts for tenancy persistence.

pub mod repository;

pub use repository::{TenancyRepository, TenancyRepositoryError, TenancyRepositoryResult};
