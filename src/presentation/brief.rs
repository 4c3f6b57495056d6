//! Brief rendering: result text plus a compact stage digest.

use crate::stage::{LocalState, Stage};

/// Render `content` followed by the current stage, state, tools, and transitions.
///
/// Tool and transition names keep registration order.
pub fn render(content: &str, stage: &Stage, state: &LocalState) -> String {
    [
        content.to_string(),
        String::new(),
        format!("Current stage: {}", stage.name()),
        format!("State: {}", state.to_json_string()),
        format!("Available tools: {}", join_or_none(stage.tool_names())),
        format!(
            "Available transitions: {}",
            join_or_none(stage.transitions().iter().map(String::as_str))
        ),
    ]
    .join("\n")
}

pub(crate) fn join_or_none<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let joined = names.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}
