//! Port contracts for session storage.

pub mod store;

pub use store::{SessionStore, SessionStoreError, SessionStoreResult};
