//! Protocol-level failures raised by the orchestrator.
//!
//! These are never fatal: they travel back to the caller as structured
//! results, including across the HTTP boundary via [`ErrorBody`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// A rejected action. Rejection never mutates session state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Cannot enter stage '{stage}': unmet prerequisites {}", .missing.join(", "))]
    PrerequisiteUnmet { stage: String, missing: Vec<String> },

    #[error("Unknown tool '{tool}' in stage '{stage}'")]
    UnknownTool { stage: String, tool: String },
}

/// Machine-readable protocol error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProtocolErrorKind {
    SessionNotFound,
    InvalidTransition,
    PrerequisiteUnmet,
    UnknownTool,
    BadRequest,
}

impl ProtocolError {
    pub fn kind(&self) -> ProtocolErrorKind {
        match self {
            Self::SessionNotFound => ProtocolErrorKind::SessionNotFound,
            Self::InvalidTransition { .. } => ProtocolErrorKind::InvalidTransition,
            Self::PrerequisiteUnmet { .. } => ProtocolErrorKind::PrerequisiteUnmet,
            Self::UnknownTool { .. } => ProtocolErrorKind::UnknownTool,
        }
    }

    /// HTTP status used when this error crosses the wire.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SessionNotFound | Self::UnknownTool { .. } => 404,
            Self::InvalidTransition { .. } | Self::PrerequisiteUnmet { .. } => 409,
        }
    }
}

/// Wire representation of a failed execute request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ProtocolErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&ProtocolError> for ErrorBody {
    fn from(err: &ProtocolError) -> Self {
        let details = match err {
            ProtocolError::SessionNotFound => None,
            ProtocolError::InvalidTransition { from, to } => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            ProtocolError::PrerequisiteUnmet { stage, missing } => {
                Some(serde_json::json!({ "stage": stage, "missing": missing }))
            }
            ProtocolError::UnknownTool { stage, tool } => {
                Some(serde_json::json!({ "stage": stage, "tool": tool }))
            }
        };
        Self {
            kind: err.kind(),
            message: err.to_string(),
            details,
        }
    }
}

impl ErrorBody {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProtocolErrorKind::BadRequest,
            message: message.into(),
            details: None,
        }
    }

    /// Rebuild the typed error. `None` for kinds with no protocol counterpart.
    pub fn into_protocol_error(self) -> Option<ProtocolError> {
        let detail = |key: &str| -> String {
            self.details
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        match self.kind {
            ProtocolErrorKind::SessionNotFound => Some(ProtocolError::SessionNotFound),
            ProtocolErrorKind::InvalidTransition => Some(ProtocolError::InvalidTransition {
                from: detail("from"),
                to: detail("to"),
            }),
            ProtocolErrorKind::PrerequisiteUnmet => {
                let missing = self
                    .details
                    .as_ref()
                    .and_then(|d| d.get("missing"))
                    .and_then(|v| v.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(ToString::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                Some(ProtocolError::PrerequisiteUnmet {
                    stage: detail("stage"),
                    missing,
                })
            }
            ProtocolErrorKind::UnknownTool => Some(ProtocolError::UnknownTool {
                stage: detail("stage"),
                tool: detail("tool"),
            }),
            ProtocolErrorKind::BadRequest => None,
        }
    }
}
