//! Integration tests for acl-reorder
//!
//! These tests drive the public API only.
//!
//! # Test Organization
//!
//! - `properties`: ordering properties that must hold for any event sequence
//! - `concurrency`: lock-free readers racing a writer
//! - `config_loading`: configuration files, overrides and persisted state

pub mod concurrency;
pub mod config_loading;
pub mod properties;
