//! `PostgreSQL` adapters for tenancy persistence.

pub(crate) mod models;
mod repository;
pub(crate) mod schema;

pub(crate) use repository::apply_transition_tx;
pub use repository::{PostgresWorkspaceStore, WorkspacePgPool};
