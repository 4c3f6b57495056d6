//! Server-side orchestrator.
//!
//! Owns every live session and processes actions against them. Actions for
//! one session run strictly one at a time (each session sits behind its own
//! mutex, held across tool execution); independent sessions proceed in
//! parallel.

pub mod action;
pub mod session;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use action::{
    advertised_tools, Action, ExecuteRequest, ExecuteResponse, DEFAULT_TERMINATE_REASON,
    PROVIDE_STATE_TOOL, RESERVED_TOOL_NAMES, SESSION_HEADER, TERMINATE_SESSION_TOOL,
    TRANSITION_STAGE_TOOL,
};
pub use session::{transition, Effect, SessionState, TransitionResult};

use crate::config::OrchestratorConfig;
use crate::error::{ProtocolError, StagehandError};
use crate::presentation::{Presentation, RenderContext};
use crate::stage::Stage;
use crate::tools::{ToolArguments, ToolContext};
use crate::workflow::{Workflow, WorkflowDescriptor, WorkflowRegistry};

/// `None` once the session has been terminated.
type SessionSlot = Arc<Mutex<Option<SessionState>>>;

/// Result of one processed action.
#[derive(Debug, Clone, PartialEq)]
pub struct Processed {
    pub session_id: String,
    pub response: ExecuteResponse,
}

/// Drives sessions through the stage graphs of a [`WorkflowRegistry`].
pub struct Orchestrator {
    registry: WorkflowRegistry,
    config: OrchestratorConfig,
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl Orchestrator {
    pub fn new(registry: WorkflowRegistry) -> Self {
        Self::with_config(registry, OrchestratorConfig::default())
    }

    pub fn with_config(registry: WorkflowRegistry, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn search(&self, query: &str) -> Vec<WorkflowDescriptor> {
        self.registry.search(query)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Process one action.
    ///
    /// A handshake without a live session id for this workflow opens a new
    /// session. Every other action requires one, and fails with
    /// [`ProtocolError::SessionNotFound`] otherwise.
    pub async fn process(
        &self,
        session_id: Option<&str>,
        request: ExecuteRequest,
    ) -> Result<Processed, StagehandError> {
        let workflow = self.registry.get(&request.workflow_name).ok_or_else(|| {
            StagehandError::InvalidArgument(format!("Unknown workflow '{}'", request.workflow_name))
        })?;
        let action = request.action;
        let is_handshake = matches!(action, Action::Handshake);

        debug!(
            workflow = workflow.name(),
            session_id = session_id.unwrap_or("-"),
            action = action.kind(),
            "Processing action"
        );

        let slot = match session_id {
            Some(id) => self.sessions.read().await.get(id).cloned(),
            None => None,
        };
        let Some(slot) = slot else {
            return if is_handshake {
                self.open(&workflow).await
            } else {
                Err(ProtocolError::SessionNotFound.into())
            };
        };

        let mut guard = slot.lock().await;
        let Some(state) = guard.as_ref().filter(|s| s.workflow == workflow.name()) else {
            return if is_handshake {
                self.open(&workflow).await
            } else {
                Err(ProtocolError::SessionNotFound.into())
            };
        };

        let id = state.id.clone();
        let result = transition(state, &workflow, action)?;
        let (next, response) = self.run_effect(&workflow, result).await?;

        match next {
            Some(state) => *guard = Some(state),
            None => {
                *guard = None;
                self.sessions.write().await.remove(&id);
                info!(workflow = workflow.name(), session_id = %id, "Session terminated");
            }
        }

        Ok(Processed {
            session_id: id,
            response,
        })
    }

    async fn open(&self, workflow: &Workflow) -> Result<Processed, StagehandError> {
        let id = Uuid::new_v4().to_string();
        let state = SessionState::new(&id, workflow);
        let result = transition(&state, workflow, Action::Handshake)?;
        let (next, response) = self.run_effect(workflow, result).await?;

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(next)));
        info!(
            workflow = workflow.name(),
            session_id = %id,
            stage = %response.current_stage,
            "Session created"
        );

        Ok(Processed {
            session_id: id,
            response,
        })
    }

    /// Execute the effect of a transition. Returns the state to commit
    /// (`None` when the session ends) and the reply.
    async fn run_effect(
        &self,
        workflow: &Workflow,
        result: TransitionResult,
    ) -> Result<(Option<SessionState>, ExecuteResponse), ProtocolError> {
        let TransitionResult {
            new_state: mut state,
            effect,
        } = result;
        let stage = workflow
            .stage(&state.current_stage)
            .ok_or(ProtocolError::SessionNotFound)?;

        match effect {
            Effect::Respond {
                presentation,
                content,
                include_tools,
            } => {
                let response = render(
                    workflow,
                    stage,
                    &state,
                    presentation,
                    &content,
                    include_tools,
                    false,
                );
                Ok((Some(state), response))
            }

            Effect::InvokeTool { task, args } => {
                let tool = stage.tool(&task).ok_or_else(|| ProtocolError::UnknownTool {
                    stage: stage.name().to_string(),
                    tool: task.clone(),
                })?;
                let ctx = ToolContext {
                    session_id: state.id.clone(),
                    workflow: workflow.name().to_string(),
                    stage: stage.name().to_string(),
                    state: state.local_state.as_map().clone(),
                };

                let outcome = tool.invoke(ctx, ToolArguments::from_map(args)).await;
                let (content, is_error) = match outcome {
                    Ok(output) => {
                        state.apply_state_updates(output.state_updates);
                        (output.result, false)
                    }
                    Err(err) => {
                        warn!(
                            workflow = workflow.name(),
                            session_id = %state.id,
                            tool = %task,
                            error = %err,
                            "Tool execution failed"
                        );
                        (err.to_string(), true)
                    }
                };
                let response = render(
                    workflow,
                    stage,
                    &state,
                    Presentation::Brief,
                    &content,
                    false,
                    is_error,
                );
                Ok((Some(state), response))
            }

            Effect::Terminate { reason, content } => {
                debug!(session_id = %state.id, %reason, "Terminating session");
                let response = render(
                    workflow,
                    stage,
                    &state,
                    Presentation::Brief,
                    &content,
                    false,
                    false,
                );
                Ok((None, response))
            }
        }
    }

    /// Drop sessions idle for at least `max_idle`. Sessions with an action in
    /// flight are skipped. Returns the number dropped.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(guard) => guard
                .as_ref()
                .is_some_and(|s| now.signed_duration_since(s.last_activity) < max_idle),
            Err(_) => true,
        });
        let reaped = before - sessions.len();
        if reaped > 0 {
            info!(reaped, remaining = sessions.len(), "Reaped idle sessions");
        }
        reaped
    }

    /// [`Self::reap_idle`] with the configured idle timeout, if any.
    pub async fn reap_expired(&self) -> usize {
        match self.config.session_idle_timeout {
            Some(timeout) => self.reap_idle(timeout).await,
            None => 0,
        }
    }
}

fn render(
    workflow: &Workflow,
    stage: &Stage,
    state: &SessionState,
    presentation: Presentation,
    content: &str,
    include_tools: bool,
    is_error: bool,
) -> ExecuteResponse {
    let ctx = RenderContext {
        workflow_name: workflow.name(),
        workflow_description: workflow.description(),
        stage,
        state: &state.local_state,
    };
    ExecuteResponse {
        content: presentation.render(content, &ctx),
        current_stage: stage.name().to_string(),
        tools: include_tools.then(|| advertised_tools(stage)),
        is_error,
    }
}
