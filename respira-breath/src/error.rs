//! Error types for pattern validation and catalog lookups.

/// Error type for breathing session operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BreathError {
    /// Pattern failed validation (non-positive inhale/exhale/cycle count,
    /// negative or non-finite hold)
    #[error("Invalid breathing pattern: {0}")]
    InvalidPattern(String),

    /// Catalog lookup miss
    #[error("Unknown breathing pattern: {0}")]
    UnknownPattern(String),
}

/// Result type for breathing session operations
pub type Result<T> = std::result::Result<T, BreathError>;
