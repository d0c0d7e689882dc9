//! Tenancy: users, companies, boards, and board memberships.
//!
//! This module owns the entity graph every authorization decision reads and
//! the invariants that keep it consistent:
//!
//! - a board membership always links a user to a board of its own company;
//! - a user belongs to at most one company, and leaving it voids every
//!   membership on that company's boards;
//! - the platform keeps at least one `platform_admin`, and a company keeps at
//!   least one `company_admin`.
//!
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
