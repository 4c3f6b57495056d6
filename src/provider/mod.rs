//! LLM boundary: the model provider trait and an OpenAI-compatible implementation.

pub mod format;
pub mod http;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::StagehandConfig;
use crate::error::StagehandError;
use crate::types::{AgentToolCall, ModelMessage};

/// A request sent to a model provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f64>,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Response from a provider: text, tool-call requests, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResponse {
    pub text: String,
    pub tool_calls: Vec<AgentToolCall>,
    pub finish_reason: Option<String>,
}

/// An opaque function from (history, tool schema) to one assistant message.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &str;
    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, StagehandError>;
}

/// Create the configured provider.
pub fn create_provider(config: &StagehandConfig) -> Result<Arc<dyn ModelProvider>, StagehandError> {
    let api_key = config
        .llm_api_key
        .clone()
        .ok_or_else(|| StagehandError::Configuration("Missing OPENAI_API_KEY".into()))?;
    Ok(Arc::new(openai::OpenAiProvider::new(
        config.model.clone(),
        api_key,
        config.llm_base_url.clone(),
    )))
}
