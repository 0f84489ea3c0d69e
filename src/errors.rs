//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Invalid command-line argument combination.
    Usage(String),
    /// Configuration file or hook script loading failure.
    Config(String),
    /// Device enumeration, connection, or process-listing failure.
    Device(String),
    /// Per-pid attach or script-load failure (recoverable; retried by the
    /// supervisor on a later tick).
    Attach(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(msg) => write!(f, "usage: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Device(msg) => write!(f, "device: {msg}"),
            Self::Attach(msg) => write!(f, "attach: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}
