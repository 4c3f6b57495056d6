//! Client-side session manager: one tracked session per workflow.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::transport::WorkflowTransport;
use crate::config::StagehandConfig;
use crate::error::{ProtocolError, Result, StagehandError};
use crate::orchestrator::{Action, ExecuteRequest, ExecuteResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tracked {
    server_url: String,
    session_id: String,
}

/// Issues, attaches, and tears down session ids. Ids are opaque here.
pub struct SessionManager {
    transport: Arc<dyn WorkflowTransport>,
    sessions: HashMap<String, Tracked>,
    connect_timeout: Duration,
    request_timeout: Duration,
    terminate_timeout: Duration,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn WorkflowTransport>, config: &StagehandConfig) -> Self {
        Self {
            transport,
            sessions: HashMap::new(),
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
            terminate_timeout: config.terminate_timeout,
        }
    }

    pub fn transport(&self) -> &Arc<dyn WorkflowTransport> {
        &self.transport
    }

    /// The session id tracked for `workflow`, if any.
    pub fn attach(&self, workflow: &str) -> Option<&str> {
        self.sessions.get(workflow).map(|t| t.session_id.as_str())
    }

    /// Handshake with `workflow`, resuming the tracked session when one exists.
    ///
    /// Returns the session id (unchanged if the server resumed it) and the
    /// handshake response.
    pub async fn begin(
        &mut self,
        server_url: &str,
        workflow: &str,
    ) -> Result<(String, ExecuteResponse)> {
        let existing = self.attach(workflow).map(ToString::to_string);
        let request = ExecuteRequest::new(workflow, Action::Handshake);
        let executed = self
            .transport
            .execute(server_url, &request, existing.as_deref(), self.connect_timeout)
            .await?;

        let session_id = executed.session_id.or(existing).ok_or_else(|| {
            StagehandError::api(502, "handshake response carried no session id")
        })?;
        self.sessions.insert(
            workflow.to_string(),
            Tracked {
                server_url: server_url.to_string(),
                session_id: session_id.clone(),
            },
        );
        info!(workflow, session_id = %session_id, "Session established");
        Ok((session_id, executed.response))
    }

    /// Send a non-handshake action on the tracked session.
    ///
    /// A `SessionNotFound` reply drops the local mapping.
    pub async fn send(&mut self, workflow: &str, action: Action) -> Result<ExecuteResponse> {
        let tracked = self
            .sessions
            .get(workflow)
            .cloned()
            .ok_or_else(|| StagehandError::NotConnected(workflow.to_string()))?;
        let request = ExecuteRequest::new(workflow, action);
        debug!(workflow, action = request.action.kind(), "Sending action");

        let result = self
            .transport
            .execute(
                &tracked.server_url,
                &request,
                Some(&tracked.session_id),
                self.request_timeout,
            )
            .await;

        match result {
            Ok(executed) => Ok(executed.response),
            Err(err) => {
                if err.as_protocol() == Some(&ProtocolError::SessionNotFound) {
                    warn!(workflow, "Server no longer knows this session; dropping it");
                    self.sessions.remove(workflow);
                }
                Err(err)
            }
        }
    }

    /// Drop the mapping without notifying the server.
    pub fn forget(&mut self, workflow: &str) -> Option<String> {
        self.sessions.remove(workflow).map(|t| t.session_id)
    }

    /// Drop the mapping for `workflow` and best-effort terminate it remotely.
    ///
    /// Returns the dropped session id. Remote failures are logged, never returned.
    pub async fn end(&mut self, workflow: &str, reason: Option<&str>) -> Option<String> {
        let tracked = self.sessions.remove(workflow)?;
        let request = ExecuteRequest::new(workflow, Action::terminate(reason));
        let outcome = self
            .transport
            .execute(
                &tracked.server_url,
                &request,
                Some(&tracked.session_id),
                self.terminate_timeout,
            )
            .await;
        if let Err(err) = outcome {
            warn!(workflow, error = %err, "Terminate notification failed; session dropped locally");
        }
        Some(tracked.session_id)
    }
}
