//! Error types for Stagehand.

pub mod protocol;

pub use protocol::{ErrorBody, ProtocolError};

use thiserror::Error;

use crate::client::mode::ModeError;

/// Primary error type for all Stagehand operations.
#[derive(Error, Debug)]
pub enum StagehandError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not connected to workflow: {0}")]
    NotConnected(String),

    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Protocol,
    ToolExecution,
    Transport,
    Configuration,
    Serialization,
    Provider,
    Unknown,
}

impl StagehandError {
    /// Create an API error from a non-2xx status.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Protocol(_) | Self::Mode(_) => ErrorCategory::Protocol,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::Network(_) | Self::Timeout(_) | Self::Api { .. } | Self::Io(_) => {
                ErrorCategory::Transport
            }
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Provider { .. } => ErrorCategory::Provider,
            Self::InvalidArgument(_) | Self::NotConnected(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this is a transport failure (network, timeout, non-2xx status).
    pub fn is_transport(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    /// The protocol error, if this is one.
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StagehandError>;
