//! Comprehensive rendering: full onboarding context sent once per session.

use super::brief::join_or_none;
use super::json::to_display_string;
use super::RenderContext;

pub fn render(content: &str, ctx: &RenderContext<'_>) -> String {
    let stage = ctx.stage;
    let mut lines = vec![content.to_string(), String::new()];

    lines.push(format!("Workflow: {}", ctx.workflow_name));
    if !ctx.workflow_description.is_empty() {
        lines.push(format!("Workflow description: {}", ctx.workflow_description));
    }
    lines.push(format!("Current stage: {}", stage.name()));
    if !stage.description().is_empty() {
        lines.push(format!("Stage description: {}", stage.description()));
    }
    lines.push(format!(
        "Prerequisites: {}",
        join_or_none(stage.prerequisites().iter().map(String::as_str))
    ));
    lines.push(format!("State: {}", ctx.state.to_json_string()));
    lines.push(String::new());

    if stage.tools().is_empty() {
        lines.push("Available tools: none".to_string());
    } else {
        lines.push("Available tools:".to_string());
        for tool in stage.tools() {
            lines.push(format!("- {}: {}", tool.name(), tool.description()));
            lines.push(format!(
                "  Parameters: {}",
                to_display_string(&tool.parameters().schema)
            ));
        }
    }
    lines.push(format!(
        "Available transitions: {}",
        join_or_none(stage.transitions().iter().map(String::as_str))
    ));
    lines.push(String::new());
    lines.push(
        "Protocol actions: transition_stage(target_stage), provide_state(...), terminate_session(reason)"
            .to_string(),
    );

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{LocalState, Stage};
    use crate::tools::{StageTool, ToolOutput, ToolParameters};

    #[test]
    fn includes_schemas_and_descriptions() {
        let stage = Stage::builder("portfolio")
            .description("Ongoing monitoring")
            .prerequisite("search")
            .tool(StageTool::sync(
                "track_rent_comps",
                "Track competitive rent pricing",
                ToolParameters::object()
                    .string("property_id", "Property", true)
                    .build(),
                |_, _| Ok(ToolOutput::default()),
            ))
            .build();
        let state = LocalState::new();
        let ctx = RenderContext {
            workflow_name: "zillow",
            workflow_description: "Real estate investing",
            stage: &stage,
            state: &state,
        };

        let text = render("Session started.", &ctx);

        assert!(text.starts_with("Session started.\n\nWorkflow: zillow\n"));
        assert!(text.contains("Workflow description: Real estate investing"));
        assert!(text.contains("Stage description: Ongoing monitoring"));
        assert!(text.contains("Prerequisites: search"));
        assert!(text.contains("- track_rent_comps: Track competitive rent pricing"));
        assert!(text.contains(r#""property_id": {"type": "string""#));
        assert!(text.contains("Available transitions: none"));
    }

    #[test]
    fn is_a_superset_of_brief_digest() {
        let stage = Stage::builder("search").transition("underwriting").build();
        let state = LocalState::new();
        let ctx = RenderContext {
            workflow_name: "zillow",
            workflow_description: "",
            stage: &stage,
            state: &state,
        };

        let text = render("hi", &ctx);

        assert!(!text.contains("Workflow description"));
        assert!(text.contains("Current stage: search"));
        assert!(text.contains("State: {}"));
        assert!(text.contains("Available tools: none"));
        assert!(text.contains("Available transitions: underwriting"));
    }
}
