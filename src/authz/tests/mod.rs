//! Unit tests for the authorization module.
