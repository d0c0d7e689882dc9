//! Invitation repository implementations.
//!
//! Invitations share a store with the tenancy graph so that accepting one
//! and joining its company commit together. Both adapters therefore extend
//! the tenancy stores instead of defining their own.

mod memory;
mod postgres;
