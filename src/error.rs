//! # Error Types
//!
//! Custom error types for TelloPad using `thiserror`.

use thiserror::Error;

/// Main error type for TelloPad
#[derive(Debug, Error)]
pub enum TelloPadError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No supported gamepad found under /dev/input
    #[error("No {0} controller found")]
    ControllerNotFound(String),

    /// Gamepad errors (open, read, disconnect)
    #[error("Controller error: {0}")]
    Controller(String),

    /// Drone link errors
    #[error("Drone error: {0}")]
    Drone(String),

    /// External decoder process errors
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// Detector model loading or inference errors
    #[error("Detector error: {0}")]
    Detector(String),

    /// Incomplete raw frame read from the decoder output
    #[error("Short frame read: expected {expected} bytes, got {got}")]
    FrameRead { expected: usize, got: usize },
}

/// Result type alias for TelloPad
pub type Result<T> = std::result::Result<T, TelloPadError>;
