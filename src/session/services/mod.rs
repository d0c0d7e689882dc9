//! Session context services.

mod context;

pub use context::{SessionContextService, SessionError, SessionResult};
