//! Transports that carry execute and discovery requests to a workflow server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ErrorBody, Result, StagehandError};
use crate::orchestrator::{ExecuteRequest, ExecuteResponse, Orchestrator, SESSION_HEADER};
use crate::provider::http::shared_client;
use crate::util::with_timeout;
use crate::workflow::WorkflowDescriptor;

/// Reply to an execute request, with the session id the server assigned or echoed.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub response: ExecuteResponse,
    pub session_id: Option<String>,
}

/// How the client reaches a workflow server.
#[async_trait]
pub trait WorkflowTransport: Send + Sync {
    /// Send one action. `session_id` travels as the correlation header.
    async fn execute(
        &self,
        server_url: &str,
        request: &ExecuteRequest,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<Executed>;

    /// Keyword search over the workflows a server hosts.
    async fn search(
        &self,
        server_url: &str,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<WorkflowDescriptor>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    workflows: Vec<WorkflowDescriptor>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// HTTP transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: shared_client().clone(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Map a non-2xx reply: protocol failures stay structured, anything else is an API error.
fn decode_failure(status: u16, body: &str) -> StagehandError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope.error.message.clone();
            match envelope.error.into_protocol_error() {
                Some(protocol) => protocol.into(),
                None => StagehandError::api(status, message),
            }
        }
        Err(_) => StagehandError::api(status, body),
    }
}

fn endpoint(server_url: &str, path: &str) -> String {
    format!("{}{}", server_url.trim_end_matches('/'), path)
}

#[async_trait]
impl WorkflowTransport for HttpTransport {
    async fn execute(
        &self,
        server_url: &str,
        request: &ExecuteRequest,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<Executed> {
        let mut builder = self
            .client
            .post(endpoint(server_url, "/execute"))
            .json(request);
        if let Some(id) = session_id {
            let value = HeaderValue::from_str(id)
                .map_err(|e| StagehandError::InvalidArgument(format!("session id: {e}")))?;
            builder = builder.header(SESSION_HEADER, value);
        }

        let response = with_timeout(timeout, async {
            builder.send().await.map_err(StagehandError::from)
        })
        .await?;
        let status = response.status();
        let echoed = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        if !status.is_success() {
            let body = with_timeout(timeout, async {
                response.text().await.map_err(StagehandError::from)
            })
            .await?;
            return Err(decode_failure(status.as_u16(), &body));
        }

        let response: ExecuteResponse = with_timeout(timeout, async {
            response.json().await.map_err(StagehandError::from)
        })
        .await?;
        debug!(
            action = request.action.kind(),
            stage = %response.current_stage,
            "Execute succeeded"
        );
        Ok(Executed {
            response,
            session_id: echoed,
        })
    }

    async fn search(
        &self,
        server_url: &str,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<WorkflowDescriptor>> {
        let builder = self
            .client
            .get(endpoint(server_url, "/api/workflows"))
            .query(&[("search", query)]);

        let response = with_timeout(timeout, async {
            builder.send().await.map_err(StagehandError::from)
        })
        .await?;
        let status = response.status();
        if !status.is_success() {
            let body = with_timeout(timeout, async {
                response.text().await.map_err(StagehandError::from)
            })
            .await?;
            return Err(StagehandError::api(status.as_u16(), body));
        }
        let parsed: SearchResponse = with_timeout(timeout, async {
            response.json().await.map_err(StagehandError::from)
        })
        .await?;
        Ok(parsed.workflows)
    }
}

/// In-process transport that calls an [`Orchestrator`] directly.
#[derive(Clone)]
pub struct LocalTransport {
    orchestrator: Arc<Orchestrator>,
}

impl LocalTransport {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl WorkflowTransport for LocalTransport {
    async fn execute(
        &self,
        _server_url: &str,
        request: &ExecuteRequest,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<Executed> {
        let processed =
            with_timeout(timeout, self.orchestrator.process(session_id, request.clone())).await?;
        Ok(Executed {
            response: processed.response,
            session_id: Some(processed.session_id),
        })
    }

    async fn search(
        &self,
        _server_url: &str,
        query: &str,
        _timeout: Duration,
    ) -> Result<Vec<WorkflowDescriptor>> {
        Ok(self.orchestrator.search(query))
    }
}
