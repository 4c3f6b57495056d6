//! Shared test helpers and mock provider.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use stagehand::client::{LocalTransport, WorkflowClient};
use stagehand::config::StagehandConfig;
use stagehand::error::StagehandError;
use stagehand::orchestrator::Orchestrator;
use stagehand::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use stagehand::types::AgentToolCall;

/// A mock provider that replays scripted responses and records every request.
pub struct MockProvider {
    model_id: String,
    responses: Mutex<VecDeque<Result<ProviderResponse, StagehandError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            model_id: "mock-model".to_string(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a final text answer.
    pub fn queue_response(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(ProviderResponse {
            text: text.to_string(),
            tool_calls: vec![],
            finish_reason: Some("stop".to_string()),
        }));
    }

    /// Queue a single tool call.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) {
        self.responses.lock().unwrap().push_back(Ok(ProviderResponse {
            text: String::new(),
            tool_calls: vec![AgentToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: args,
            }],
            finish_reason: Some("tool_calls".to_string()),
        }));
    }

    /// Queue a provider failure.
    pub fn queue_error(&self, error: StagehandError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Tool names offered to the model, one entry per round.
    pub fn tool_names_per_round(&self) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.tools.iter().map(|t| t.name.clone()).collect())
            .collect()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, StagehandError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ProviderResponse {
                    text: "Mock response".to_string(),
                    tool_calls: vec![],
                    finish_reason: Some("stop".to_string()),
                })
            })
    }
}

/// Orchestrator hosting the demo workflows.
pub fn demo_orchestrator() -> Arc<Orchestrator> {
    let config = StagehandConfig::default();
    Arc::new(Orchestrator::new(
        stagehand::demo::registry(&config.server_url).unwrap(),
    ))
}

/// Client wired to an in-process orchestrator.
pub fn local_client(orchestrator: Arc<Orchestrator>, config: &StagehandConfig) -> WorkflowClient {
    WorkflowClient::new(Arc::new(LocalTransport::new(orchestrator)), config)
}
