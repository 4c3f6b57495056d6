//! Convenience re-exports for common use.

pub use crate::client::{Mode, WorkflowClient, WorkflowTransport};
pub use crate::config::StagehandConfig;
pub use crate::conversation::Conversation;
pub use crate::error::{ProtocolError, Result, StagehandError};
pub use crate::orchestrator::{Action, Orchestrator};
pub use crate::presentation::Presentation;
pub use crate::provider::ModelProvider;
pub use crate::stage::{Stage, StageTool, ToolOutput};
pub use crate::tools::{ToolArguments, ToolParameters};
pub use crate::types::{ModelMessage, Role};
pub use crate::workflow::{Workflow, WorkflowRegistry};
