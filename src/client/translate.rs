//! Mapping between protocol tools/actions and LLM function calling.

use serde_json::{Map, Value};

use crate::error::StagehandError;
use crate::orchestrator::{
    Action, PROVIDE_STATE_TOOL, TERMINATE_SESSION_TOOL, TRANSITION_STAGE_TOOL,
};
use crate::provider::ToolDefinition;
use crate::tools::arguments::coerce_arguments;
use crate::tools::ToolDescriptor;

/// Server-declared tool to LLM function declaration. Structure-preserving.
pub fn to_tool_definition(tool: &ToolDescriptor) -> ToolDefinition {
    ToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.input_schema.clone(),
    }
}

pub fn to_tool_definitions(tools: &[ToolDescriptor]) -> Vec<ToolDefinition> {
    tools.iter().map(to_tool_definition).collect()
}

/// LLM tool call to protocol action.
///
/// Reserved names map to their fixed actions; every other name becomes a
/// `method_call` carrying the arguments unchanged. Fails only when the
/// arguments are not a JSON object.
pub fn to_action(name: &str, arguments: Value) -> Result<Action, StagehandError> {
    let args = coerce_arguments(arguments)?;
    Ok(match name {
        TRANSITION_STAGE_TOOL => Action::StageTransition {
            target: string_arg(&args, "target_stage"),
        },
        PROVIDE_STATE_TOOL => Action::StateInput { updates: args },
        TERMINATE_SESSION_TOOL => Action::terminate(args.get("reason").and_then(Value::as_str)),
        _ => Action::MethodCall {
            task: name.to_string(),
            args,
        },
    })
}

fn string_arg(args: &Map<String, Value>, key: &str) -> String {
    match args.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
