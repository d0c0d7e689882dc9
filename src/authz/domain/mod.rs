//! Authorization vocabulary: principals, role sets, and the override chain.

mod accessible;
mod principal;
mod required;
mod rule;

pub use accessible::AccessibleBoard;
pub use principal::Principal;
pub use required::RequiredRoles;
pub use rule::{AccessRule, EffectiveRole, resolve};
