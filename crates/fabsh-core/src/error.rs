//! Error types for the fabsh shell.

use thiserror::Error;

/// A shared error type for the entire fabsh workspace.
///
/// Typed variants with automatic conversion from the I/O and TOML errors the
/// shell runs into while touching history and configuration files.
#[derive(Error, Debug, Clone)]
pub enum FabshError {
    /// IO error (history file, terminal, config file)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// The event processor is no longer accepting work
    #[error("Event processor unavailable: {0}")]
    ProcessorUnavailable(String),

    /// Terminal / line editor error
    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl FabshError {
    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a ProcessorUnavailable error
    pub fn processor_unavailable(message: impl Into<String>) -> Self {
        Self::ProcessorUnavailable(message.into())
    }

    /// Creates a Terminal error
    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal(message.into())
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if the processor refused the work item
    pub fn is_processor_unavailable(&self) -> bool {
        matches!(self, Self::ProcessorUnavailable(_))
    }
}

impl From<std::io::Error> for FabshError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<toml::de::Error> for FabshError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, FabshError>`.
pub type Result<T> = std::result::Result<T, FabshError>;
