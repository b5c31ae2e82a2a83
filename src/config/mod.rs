//! Configuration module for acl-reorder
//!
//! This module provides configuration types and loading utilities.
//!
//! # Example
//!
//! ```no_run
//! use acl_reorder::config::{load_config, Config};
//!
//! let config = load_config("/etc/acl-reorder/config.json").unwrap();
//! println!("Rules: {}", config.rules.len());
//! ```

mod loader;
mod types;

pub use loader::{
    apply_env_overrides, create_default_config, load_config, load_config_str,
    load_config_with_env,
};
pub use types::{Config, LogConfig, SimulationConfig, WorkloadConfig};
