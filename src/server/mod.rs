//! HTTP adapter for the orchestrator.
//!
//! Routes:
//! - `POST /execute` runs one action; the session id travels in `X-Session-Id`
//! - `GET /api/workflows?search=` keyword discovery
//! - `GET /health`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{ErrorBody, ProtocolError, StagehandError};
use crate::orchestrator::{ExecuteRequest, Orchestrator, SESSION_HEADER};
use crate::workflow::WorkflowDescriptor;

/// Build the router over a shared orchestrator.
pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .route("/api/workflows", get(list_workflows))
        .route("/health", get(health))
        .with_state(orchestrator)
}

/// Bind `addr` and serve until the process exits.
///
/// When the orchestrator has an idle timeout configured, a background task
/// reaps expired sessions once per timeout period.
pub async fn serve(orchestrator: Arc<Orchestrator>, addr: SocketAddr) -> Result<(), StagehandError> {
    if let Some(period) = orchestrator.config().session_idle_timeout {
        let reaper = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                reaper.reap_expired().await;
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, workflows = orchestrator.registry().descriptors().len(), "Workflow server listening");
    axum::serve(listener, create_router(orchestrator)).await?;
    Ok(())
}

async fn execute(
    State(orchestrator): State<Arc<Orchestrator>>,
    headers: HeaderMap,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    let processed = orchestrator.process(session_id, request).await?;
    debug!(
        session_id = %processed.session_id,
        stage = %processed.response.current_stage,
        "Execute handled"
    );
    Ok((
        [(SESSION_HEADER, processed.session_id)],
        Json(processed.response),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: String,
}

#[derive(Debug, Serialize)]
struct WorkflowList {
    workflows: Vec<WorkflowDescriptor>,
}

async fn list_workflows(
    State(orchestrator): State<Arc<Orchestrator>>,
    Query(query): Query<SearchQuery>,
) -> Json<WorkflowList> {
    let workflows = orchestrator.search(&query.search);
    debug!(query = %query.search, count = workflows.len(), "Workflow search");
    Json(WorkflowList { workflows })
}

async fn health(State(orchestrator): State<Arc<Orchestrator>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sessions": orchestrator.session_count().await,
    }))
}

enum AppError {
    Protocol(ProtocolError),
    BadRequest(String),
}

impl From<StagehandError> for AppError {
    fn from(err: StagehandError) -> Self {
        match err {
            StagehandError::Protocol(protocol) => Self::Protocol(protocol),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Protocol(err) => (
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST),
                ErrorBody::from(&err),
            ),
            AppError::BadRequest(message) => {
                warn!(%message, "Rejected execute request");
                (StatusCode::BAD_REQUEST, ErrorBody::bad_request(message))
            }
        };
        (status, Json(json!({ "error": body }))).into_response()
    }
}
