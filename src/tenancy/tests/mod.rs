//! Unit tests for the tenancy module.
