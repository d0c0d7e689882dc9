//! Tenantry: authorization and tenancy scoping for multi-tenant workspaces.
//!
//! Companies contain boards, and users hold a role at three nested scopes:
//! platform, company, and board. This crate decides who may act where and
//! keeps the tenancy graph consistent while users move between companies.
//!
//! # Architecture
//!
//! Tenantry follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//!
//! # Modules
//!
//! - [`tenancy`]: users, companies, boards, memberships, and administration
//! - [`authz`]: role resolution and permission checks
//! - [`invitation`]: single-use company invitations with lazy expiry
//! - [`session`]: per-principal active board context
//! - [`config`]: engine configuration
//! - [`error`]: the error taxonomy shared by every service

pub mod authz;
pub mod config;
pub mod error;
pub mod invitation;
pub mod session;
pub mod tenancy;

#[cfg(test)]
mod test_support;
