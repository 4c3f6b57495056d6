//! Per-session state and the pure transition function that advances it.
//!
//! `transition` never performs I/O and never mutates its input. Every
//! rejection leaves the caller's state untouched; the caller commits
//! `new_state` only after running the returned [`Effect`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::action::Action;
use crate::error::ProtocolError;
use crate::presentation::Presentation;
use crate::stage::{LocalState, Stage};
use crate::workflow::Workflow;

/// Live state for one session of one workflow.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: String,
    pub workflow: String,
    pub current_stage: String,
    /// Stages entered so far, in first-visit order.
    pub visited: Vec<String>,
    /// Local state of the current stage.
    pub local_state: LocalState,
    /// Local state of stages the session has left, kept for re-entry.
    parked: HashMap<String, LocalState>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionState {
    /// A fresh session positioned at the workflow's entry stage.
    pub fn new(id: impl Into<String>, workflow: &Workflow) -> Self {
        let entry = workflow.entry_stage();
        let now = Utc::now();
        Self {
            id: id.into(),
            workflow: workflow.name().to_string(),
            current_stage: entry.name().to_string(),
            visited: vec![entry.name().to_string()],
            local_state: entry.initial_state(),
            parked: HashMap::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn has_visited(&self, stage: &str) -> bool {
        self.visited.iter().any(|s| s == stage)
    }

    fn enter(&mut self, stage: &Stage) {
        let previous = std::mem::replace(&mut self.current_stage, stage.name().to_string());
        let restored = self
            .parked
            .remove(stage.name())
            .unwrap_or_else(|| stage.initial_state());
        let left = std::mem::replace(&mut self.local_state, restored);
        self.parked.insert(previous, left);
        if !self.has_visited(stage.name()) {
            self.visited.push(stage.name().to_string());
        }
    }

    /// Merge tool-produced updates into the current stage's state.
    pub fn apply_state_updates(&mut self, updates: Map<String, Value>) {
        self.local_state.merge(updates);
    }
}

/// Work the orchestrator performs after a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Render `content` and reply.
    Respond {
        presentation: Presentation,
        content: String,
        /// Whether the reply carries the (possibly changed) tool list.
        include_tools: bool,
    },
    /// Invoke a stage tool against a snapshot of the new state, then reply Brief.
    InvokeTool {
        task: String,
        args: Map<String, Value>,
    },
    /// Reply Brief with `content`, then drop the session.
    Terminate { reason: String, content: String },
}

#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effect: Effect,
}

fn respond(
    state: SessionState,
    presentation: Presentation,
    content: String,
    include_tools: bool,
) -> TransitionResult {
    TransitionResult {
        new_state: state,
        effect: Effect::Respond {
            presentation,
            content,
            include_tools,
        },
    }
}

/// Advance `state` by `action` within `workflow`.
pub fn transition(
    state: &SessionState,
    workflow: &Workflow,
    action: Action,
) -> Result<TransitionResult, ProtocolError> {
    if state.workflow != workflow.name() {
        return Err(ProtocolError::SessionNotFound);
    }
    let current = workflow
        .stage(&state.current_stage)
        .ok_or(ProtocolError::SessionNotFound)?;

    let mut next = state.clone();
    next.last_activity = Utc::now();

    match action {
        Action::Handshake => {
            let content = format!("Connected to workflow '{}'.", workflow.name());
            Ok(respond(next, Presentation::Comprehensive, content, true))
        }

        Action::MethodCall { task, args } => {
            if current.tool(&task).is_none() {
                return Err(ProtocolError::UnknownTool {
                    stage: current.name().to_string(),
                    tool: task,
                });
            }
            Ok(TransitionResult {
                new_state: next,
                effect: Effect::InvokeTool { task, args },
            })
        }

        Action::StageTransition { target } => {
            let target_stage = match workflow.stage(&target) {
                Some(stage) if current.can_transition_to(&target) => stage,
                _ => {
                    return Err(ProtocolError::InvalidTransition {
                        from: current.name().to_string(),
                        to: target,
                    })
                }
            };
            let missing: Vec<String> = target_stage
                .prerequisites()
                .iter()
                .filter(|p| !state.has_visited(p))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(ProtocolError::PrerequisiteUnmet {
                    stage: target,
                    missing,
                });
            }

            next.enter(target_stage);
            let content = format!("Transitioned from '{}' to '{}'.", current.name(), target);
            Ok(respond(next, Presentation::Brief, content, true))
        }

        Action::StateInput { updates } => {
            let content = if updates.is_empty() {
                "No state changes.".to_string()
            } else {
                let keys: Vec<&str> = updates.keys().map(String::as_str).collect();
                format!("Updated state: {}", keys.join(", "))
            };
            next.local_state.merge(updates);
            Ok(respond(next, Presentation::Brief, content, false))
        }

        Action::TerminateSession { reason } => {
            let content = format!("Session terminated: {reason}");
            Ok(TransitionResult {
                new_state: next,
                effect: Effect::Terminate { reason, content },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{StageTool, ToolOutput, ToolParameters};
    use serde_json::json;

    fn workflow() -> Workflow {
        let stub = |name: &str| {
            StageTool::sync(name, "", ToolParameters::empty(), |_, _| Ok(ToolOutput::default()))
        };
        Workflow::builder("zillow")
            .stage(
                Stage::builder("search")
                    .tool(stub("search_properties"))
                    .transition("underwriting")
                    .transition("portfolio")
                    .initial_state("radius_miles", 10)
                    .build(),
            )
            .stage(
                Stage::builder("underwriting")
                    .prerequisite("search")
                    .transition("search")
                    .transition("portfolio")
                    .build(),
            )
            .stage(
                Stage::builder("portfolio")
                    .prerequisite("underwriting")
                    .tool(stub("monitor_property_values"))
                    .build(),
            )
            .build()
            .unwrap()
    }

    fn goto(state: &SessionState, wf: &Workflow, target: &str) -> Result<SessionState, ProtocolError> {
        transition(
            state,
            wf,
            Action::StageTransition {
                target: target.into(),
            },
        )
        .map(|r| r.new_state)
    }

    #[test]
    fn new_session_starts_at_entry_with_initial_state() {
        let wf = workflow();
        let state = SessionState::new("s1", &wf);
        assert_eq!(state.current_stage, "search");
        assert_eq!(state.visited, ["search"]);
        assert_eq!(state.local_state.get("radius_miles"), Some(&json!(10)));
    }

    #[test]
    fn handshake_renders_comprehensive_with_tools() {
        let wf = workflow();
        let state = SessionState::new("s1", &wf);
        let result = transition(&state, &wf, Action::Handshake).unwrap();
        assert!(matches!(
            result.effect,
            Effect::Respond { presentation: Presentation::Comprehensive, include_tools: true, .. }
        ));
    }

    #[test]
    fn transition_requires_declared_target() {
        let wf = workflow();
        let state = SessionState::new("s1", &wf);
        let err = goto(&state, &wf, "nowhere").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidTransition {
                from: "search".into(),
                to: "nowhere".into()
            }
        );
    }

    #[test]
    fn transition_checks_prerequisites_without_mutating() {
        let wf = workflow();
        let state = SessionState::new("s1", &wf);
        let before = state.clone();

        for _ in 0..2 {
            let err = goto(&state, &wf, "portfolio").unwrap_err();
            assert_eq!(
                err,
                ProtocolError::PrerequisiteUnmet {
                    stage: "portfolio".into(),
                    missing: vec!["underwriting".into()]
                }
            );
        }
        assert_eq!(state.current_stage, before.current_stage);
        assert_eq!(state.visited, before.visited);
    }

    #[test]
    fn re_entry_restores_parked_local_state() {
        let wf = workflow();
        let mut state = SessionState::new("s1", &wf);
        let mut updates = Map::new();
        updates.insert("zip".into(), json!("78701"));
        state = transition(&state, &wf, Action::StateInput { updates })
            .unwrap()
            .new_state;

        state = goto(&state, &wf, "underwriting").unwrap();
        assert!(state.local_state.is_empty());

        state = goto(&state, &wf, "search").unwrap();
        assert_eq!(state.local_state.get("zip"), Some(&json!("78701")));
        assert_eq!(state.visited, ["search", "underwriting"]);

        state = goto(&state, &wf, "underwriting").unwrap();
        state = goto(&state, &wf, "portfolio").unwrap();
        assert_eq!(state.current_stage, "portfolio");
    }

    #[test]
    fn method_call_requires_tool_on_current_stage() {
        let wf = workflow();
        let state = SessionState::new("s1", &wf);
        let err = transition(
            &state,
            &wf,
            Action::MethodCall {
                task: "monitor_property_values".into(),
                args: Map::new(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownTool { ref stage, .. } if stage == "search"));

        let ok = transition(
            &state,
            &wf,
            Action::MethodCall {
                task: "search_properties".into(),
                args: Map::new(),
            },
        )
        .unwrap();
        assert!(matches!(ok.effect, Effect::InvokeTool { ref task, .. } if task == "search_properties"));
    }

    #[test]
    fn terminate_carries_reason() {
        let wf = workflow();
        let state = SessionState::new("s1", &wf);
        let result = transition(&state, &wf, Action::terminate(None)).unwrap();
        assert_eq!(
            result.effect,
            Effect::Terminate {
                reason: "completed".into(),
                content: "Session terminated: completed".into()
            }
        );
    }

    #[test]
    fn session_from_another_workflow_is_not_found() {
        let wf = workflow();
        let mut state = SessionState::new("s1", &wf);
        state.workflow = "travel".into();
        let err = transition(&state, &wf, Action::Handshake).unwrap_err();
        assert_eq!(err, ProtocolError::SessionNotFound);
    }
}
