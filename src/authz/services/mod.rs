//! Authorization services.

mod resolver;

pub use resolver::PermissionResolver;
