//! Session context domain types.

mod context;

pub use context::SessionContext;
