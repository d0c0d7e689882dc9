//! In-memory adapters for tests and embedded use.

mod workspace;

pub use workspace::InMemoryWorkspaceStore;
