//! Role resolution and permission checks.
//!
//! Access to a board is decided by an ordered chain of rules, evaluated
//! top-down with the first match winning:
//!
//! 1. a `platform_admin` reaches every board;
//! 2. a `company_admin` acts as `board_admin` on every board of its company;
//! 3. otherwise the principal's explicit board membership applies, and no
//!    membership means no access.
//!
//! The domain types in [`domain`] are pure; [`services::PermissionResolver`]
//! loads the principal, board, and membership from the tenancy store.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
