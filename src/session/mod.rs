//! Per-principal session context.
//!
//! Remembers the active board of each principal between requests and
//! re-checks it against current permissions. The context is ephemeral and
//! holds no authority of its own.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
