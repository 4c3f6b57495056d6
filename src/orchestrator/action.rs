//! Protocol actions and the execute request/response envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::stage::Stage;
use crate::tools::{ToolDescriptor, ToolParameters};

pub const TRANSITION_STAGE_TOOL: &str = "transition_stage";
pub const PROVIDE_STATE_TOOL: &str = "provide_state";
pub const TERMINATE_SESSION_TOOL: &str = "terminate_session";

/// Tool names stages may not register; they map to fixed protocol actions.
pub const RESERVED_TOOL_NAMES: [&str; 3] =
    [TRANSITION_STAGE_TOOL, PROVIDE_STATE_TOOL, TERMINATE_SESSION_TOOL];

pub const DEFAULT_TERMINATE_REASON: &str = "completed";

/// Header carrying the session id in both directions.
pub const SESSION_HEADER: &str = "X-Session-Id";

fn default_reason() -> String {
    DEFAULT_TERMINATE_REASON.to_string()
}

/// One step a client asks the orchestrator to take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Handshake,
    MethodCall {
        task: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    StageTransition {
        #[serde(rename = "stage")]
        target: String,
    },
    StateInput {
        #[serde(rename = "state_updates", default)]
        updates: Map<String, Value>,
    },
    TerminateSession {
        #[serde(default = "default_reason")]
        reason: String,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Handshake => "handshake",
            Self::MethodCall { .. } => "method_call",
            Self::StageTransition { .. } => "stage_transition",
            Self::StateInput { .. } => "state_input",
            Self::TerminateSession { .. } => "terminate_session",
        }
    }

    pub fn terminate(reason: Option<&str>) -> Self {
        Self::TerminateSession {
            reason: reason.unwrap_or(DEFAULT_TERMINATE_REASON).to_string(),
        }
    }
}

/// Body of `POST /execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub workflow_name: String,
    #[serde(flatten)]
    pub action: Action,
}

impl ExecuteRequest {
    pub fn new(workflow_name: impl Into<String>, action: Action) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            action,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Successful reply to an execute request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub content: String,
    pub current_stage: String,
    /// Present when the stage-scoped tool list changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDescriptor>>,
    /// Set when a tool handler failed; the content describes the failure.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

/// The tools a client should expose while `stage` is current: the stage's own
/// tools in registration order, then the reserved protocol tools.
pub fn advertised_tools(stage: &Stage) -> Vec<ToolDescriptor> {
    let mut tools = stage.tool_descriptors();

    if !stage.transitions().is_empty() {
        let targets: Vec<&str> = stage.transitions().iter().map(String::as_str).collect();
        tools.push(ToolDescriptor {
            name: TRANSITION_STAGE_TOOL.into(),
            description: "Move the session to another stage of the workflow".into(),
            input_schema: ToolParameters::object()
                .string_enum("target_stage", "Stage to enter", &targets, true)
                .build()
                .schema,
        });
    }

    tools.push(ToolDescriptor {
        name: PROVIDE_STATE_TOOL.into(),
        description: "Store key/value facts in the current stage's state".into(),
        input_schema: ToolParameters::free_form("State values to merge into the current stage")
            .schema,
    });
    tools.push(ToolDescriptor {
        name: TERMINATE_SESSION_TOOL.into(),
        description: "End the workflow session".into(),
        input_schema: ToolParameters::object()
            .string("reason", "Why the session is ending", false)
            .build()
            .schema,
    });

    tools
}
