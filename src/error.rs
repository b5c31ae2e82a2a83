//! Error types for acl-reorder
//!
//! Errors are split by layer: [`EngineError`] for the reordering core,
//! [`ConfigError`] for configuration files, and [`AclError`] as the
//! top-level type used by the binary. Each carries a recovery hint.

use std::io;

use thiserror::Error;

/// Top-level error type for acl-reorder
#[derive(Debug, Error)]
pub enum AclError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reordering engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AclError {
    /// Check if this error is recoverable (can retry operation)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Engine(e) => e.is_recoverable(),
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
        }
    }
}

/// Errors raised by the reordering engine
///
/// Every operation either succeeds completely or fails before any state is
/// published, so none of these leave a partially mutated rule list behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Invalid construction parameters; no engine is created
    #[error("Invalid engine configuration: {0}")]
    Configuration(String),

    /// A match event referenced a position outside the current list
    #[error("Position {position} out of range for a list of {len} rules")]
    OutOfRange { position: usize, len: usize },

    /// A match event referenced a rule id that is not in the list
    #[error("Unknown rule id {0}")]
    UnknownRule(u64),

    /// Engine state violated an invariant (e.g. zero hit-rate sum)
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),
}

impl EngineError {
    /// Check if this error is recoverable
    ///
    /// A rejected event does not affect the engine, so the caller may keep
    /// feeding events. The other variants indicate a broken setup.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::UnknownRule(_))
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an out-of-range error
    pub const fn out_of_range(position: usize, len: usize) -> Self {
        Self::OutOfRange { position, len }
    }

    /// Create an internal consistency error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalConsistency(msg.into())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are generally not recoverable without user intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }
}

impl From<EngineError> for ConfigError {
    fn from(err: EngineError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

/// Type alias for Result with `AclError`
pub type Result<T> = std::result::Result<T, AclError>;
