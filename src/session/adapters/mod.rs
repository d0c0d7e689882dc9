//! Session store implementations.

pub mod memory;
