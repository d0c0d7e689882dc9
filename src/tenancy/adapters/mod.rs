//! Adapter implementations of the tenancy store port.

pub mod memory;
pub mod postgres;
