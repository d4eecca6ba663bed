//! # Error Types
//!
//! Custom error types for the TruckTrace tracker using `thiserror`.

use thiserror::Error;

/// Main error type for the tracker
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection refused, timeout, DNS and other transport failures
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Malformed or unsupported NMEA sentence
    #[error("NMEA error: {0}")]
    Nmea(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate GPS serial devices could be opened
    #[error("No GPS serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Firmware template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Operator-supplied value rejected before any I/O
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for the tracker
pub type Result<T> = std::result::Result<T, TrackerError>;
