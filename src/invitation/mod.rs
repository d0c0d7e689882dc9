//! Company invitations.
//!
//! A company administrator issues a single-use, time-limited invitation to
//! an email address. The invitee accepts it with the secret token, which
//! moves them into the company as a `member` in the same atomic write that
//! consumes the invitation. The module follows hexagonal architecture:
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
