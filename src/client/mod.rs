//! Client side of the protocol: discovery, connection, and the mode-aware
//! bridge between LLM tool calls and workflow actions.

pub mod mode;
pub mod session;
pub mod translate;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

pub use mode::{Connection, Mode, ModeError, ModeEvent, ModeKind, ModeState};
pub use session::SessionManager;
pub use transport::{Executed, HttpTransport, LocalTransport, WorkflowTransport};

use crate::config::StagehandConfig;
use crate::error::{Result, StagehandError};
use crate::orchestrator::{Action, ExecuteResponse};
use crate::provider::ToolDefinition;
use crate::tools::arguments::coerce_arguments;
use crate::types::AgentToolCall;
use crate::workflow::WorkflowDescriptor;
use mode::{CONNECT_TOOL, DISCONNECT_TOOL, SEARCH_TOOL};

/// Result of a successful `connect`.
#[derive(Debug, Clone, PartialEq)]
pub struct Connected {
    pub workflow: String,
    pub session_id: String,
    pub response: ExecuteResponse,
}

/// Outcome of `disconnect`. Serializes as the tool result the model sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DisconnectStatus {
    Disconnected { server: String },
    NoActiveConnection,
}

/// Text handed back to the model for one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallOutcome {
    pub content: String,
    pub is_error: bool,
}

impl ToolCallOutcome {
    fn json(value: Value) -> Self {
        Self {
            content: value.to_string(),
            is_error: false,
        }
    }

    fn error(value: Value) -> Self {
        Self {
            content: value.to_string(),
            is_error: true,
        }
    }
}

fn error_payload(err: &StagehandError) -> Value {
    match err.as_protocol() {
        Some(protocol) => json!({ "error": err.to_string(), "kind": protocol.kind() }),
        None => json!({ "error": err.to_string() }),
    }
}

/// One client's connection state: mode controller plus session manager.
///
/// Each conversation owns its own client; nothing here is shared.
pub struct WorkflowClient {
    sessions: SessionManager,
    state: ModeState,
    server_url: String,
    request_timeout: Duration,
}

impl WorkflowClient {
    pub fn new(transport: Arc<dyn WorkflowTransport>, config: &StagehandConfig) -> Self {
        Self {
            sessions: SessionManager::new(transport, config),
            state: ModeState::default(),
            server_url: config.server_url.clone(),
            request_timeout: config.request_timeout,
        }
    }

    /// A client speaking HTTP to `config.server_url`.
    pub fn http(config: &StagehandConfig) -> Self {
        Self::new(Arc::new(HttpTransport::new()), config)
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    pub fn mode(&self) -> ModeKind {
        self.state.kind()
    }

    pub fn session_id(&self, workflow: &str) -> Option<&str> {
        self.sessions.attach(workflow)
    }

    /// Function declarations for the current mode, in LLM form.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        translate::to_tool_definitions(&self.state.exposed_tools())
    }

    fn apply(&mut self, event: ModeEvent) -> Result<()> {
        let from = self.state.kind();
        self.state = mode::transition(&self.state, event)?;
        if from != self.state.kind() {
            info!(from = %from, to = %self.state.kind(), "Mode switched");
        }
        Ok(())
    }

    /// Search for workflows and replace the discovery set with the result.
    ///
    /// Transport failures degrade to an empty result.
    pub async fn search(&mut self, query: &str) -> Result<Vec<WorkflowDescriptor>> {
        if self.state.kind() != ModeKind::User {
            return Err(ModeError::WrongMode {
                event: "search",
                mode: self.state.kind(),
            }
            .into());
        }
        let servers = match self
            .sessions
            .transport()
            .search(&self.server_url, query, self.request_timeout)
            .await
        {
            Ok(servers) => servers,
            Err(err) => {
                warn!(query, error = %err, "Search failed");
                Vec::new()
            }
        };
        info!(query, count = servers.len(), "Discovery set updated");
        self.apply(ModeEvent::SearchCompleted(servers.clone()))?;
        Ok(servers)
    }

    /// Handshake with a discovered workflow and switch to SERVER mode.
    pub async fn connect(&mut self, server_name: &str) -> Result<Connected> {
        if self.state.kind() != ModeKind::User {
            return Err(ModeError::WrongMode {
                event: "connect",
                mode: self.state.kind(),
            }
            .into());
        }
        let server = self
            .state
            .find_server(server_name)
            .ok_or_else(|| ModeError::UnknownServer(server_name.to_string()))?;
        let server_url = if server.url.is_empty() {
            self.server_url.clone()
        } else {
            server.url.clone()
        };

        let (session_id, response) = self.sessions.begin(&server_url, server_name).await?;
        self.apply(ModeEvent::Connected(Connection {
            workflow: server_name.to_string(),
            server_url,
            current_stage: response.current_stage.clone(),
            tools: response.tools.clone().unwrap_or_default(),
        }))?;

        Ok(Connected {
            workflow: server_name.to_string(),
            session_id,
            response,
        })
    }

    /// Translate a tool call into an action and send it to the connected workflow.
    pub async fn call(&mut self, tool_name: &str, arguments: Value) -> Result<ExecuteResponse> {
        let workflow = self
            .state
            .current_workflow()
            .map(ToString::to_string)
            .ok_or_else(|| StagehandError::NotConnected("no active connection".into()))?;
        let action = translate::to_action(tool_name, arguments)?;
        let terminating = matches!(action, Action::TerminateSession { .. });

        let response = match self.sessions.send(&workflow, action).await {
            Ok(response) => response,
            Err(err) => {
                if self.sessions.attach(&workflow).is_none() {
                    self.apply(ModeEvent::SessionEnded)?;
                }
                return Err(err);
            }
        };
        self.apply(ModeEvent::ServerUpdate {
            current_stage: response.current_stage.clone(),
            tools: response.tools.clone(),
        })?;
        if terminating {
            self.sessions.forget(&workflow);
            self.apply(ModeEvent::SessionEnded)?;
        }
        Ok(response)
    }

    /// Leave SERVER mode. Always succeeds locally.
    pub async fn disconnect(&mut self) -> DisconnectStatus {
        let Some(workflow) = self.state.current_workflow().map(ToString::to_string) else {
            return DisconnectStatus::NoActiveConnection;
        };
        self.sessions.end(&workflow, None).await;
        self.state = mode::transition(&self.state, ModeEvent::Disconnected).unwrap_or_default();
        info!(workflow = %workflow, "Disconnected; switched to USER mode");
        DisconnectStatus::Disconnected { server: workflow }
    }

    /// Execute one model tool call according to the current mode.
    pub async fn dispatch(&mut self, call: &AgentToolCall) -> ToolCallOutcome {
        let name = call.name.as_str();
        match self.state.kind() {
            ModeKind::User => match name {
                SEARCH_TOOL => {
                    let query = string_argument(&call.arguments, "search_query");
                    match self.search(&query).await {
                        Ok(servers) => ToolCallOutcome::json(json!({
                            "servers": servers,
                            "count": servers.len(),
                            "message": format!(
                                "Found {} servers. Use establish_connection to connect.",
                                servers.len()
                            ),
                        })),
                        Err(err) => ToolCallOutcome::error(error_payload(&err)),
                    }
                }
                CONNECT_TOOL => {
                    let server = string_argument(&call.arguments, "server_name");
                    match self.connect(&server).await {
                        Ok(connected) => {
                            let tools: Vec<String> = self
                                .state
                                .exposed_tools()
                                .into_iter()
                                .map(|t| t.name)
                                .collect();
                            ToolCallOutcome::json(json!({
                                "status": "connected",
                                "server": connected.workflow,
                                "current_stage": connected.response.current_stage,
                                "tools": tools,
                                "message": format!(
                                    "Connected to {}. Ready to use server tools.",
                                    connected.workflow
                                ),
                            }))
                        }
                        Err(err) => {
                            warn!(server = %server, error = %err, "Connection failed");
                            ToolCallOutcome::error(error_payload(&err))
                        }
                    }
                }
                _ => ToolCallOutcome::error(json!({
                    "error": format!("Tool '{name}' not available in USER mode")
                })),
            },

            ModeKind::Server => match name {
                DISCONNECT_TOOL => {
                    let status = self.disconnect().await;
                    ToolCallOutcome::json(serde_json::to_value(status).unwrap_or_default())
                }
                _ => match self.call(name, call.arguments.clone()).await {
                    Ok(response) => ToolCallOutcome {
                        content: response.content,
                        is_error: response.is_error,
                    },
                    Err(err) => {
                        warn!(tool = name, error = %err, "Workflow call failed");
                        ToolCallOutcome::error(error_payload(&err))
                    }
                },
            },
        }
    }
}

fn string_argument(arguments: &Value, key: &str) -> String {
    coerce_arguments(arguments.clone())
        .ok()
        .and_then(|args| args.get(key).and_then(Value::as_str).map(ToString::to_string))
        .unwrap_or_default()
}
