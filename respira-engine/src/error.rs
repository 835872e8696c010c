//! Error types for the signal generator and its audio backends.

/// Error type for signal generator operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No audio output could be acquired; sessions carry on visual-only
    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),

    /// Master volume outside `[0, 1]`
    #[error("Invalid volume {0}: expected a value in [0, 1]")]
    InvalidVolume(f32),

    /// Theme name not in the fixed set
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),
}

/// Result type for signal generator operations
pub type Result<T> = std::result::Result<T, EngineError>;
