//! The bounded conversation loop.
//!
//! One user message drives at most `max_iterations` model rounds. Each round
//! exposes the tool schema of the client's current mode, so a tool call that
//! switches mode changes what the model sees on the very next round.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::client::WorkflowClient;
use crate::config::StagehandConfig;
use crate::error::StagehandError;
use crate::provider::{ModelProvider, ProviderRequest};
use crate::types::ModelMessage;

/// Returned when the iteration budget runs out without a final answer.
pub const MAX_ITERATIONS_FALLBACK: &str = "Max iterations reached. Please try again.";

pub struct Conversation {
    provider: Arc<dyn ModelProvider>,
    client: WorkflowClient,
    history: Vec<ModelMessage>,
    max_iterations: usize,
}

impl Conversation {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        client: WorkflowClient,
        config: &StagehandConfig,
    ) -> Self {
        let mut history = Vec::new();
        if !config.system_prompt.is_empty() {
            history.push(ModelMessage::system(config.system_prompt.clone()));
        }
        Self {
            provider,
            client,
            history,
            max_iterations: config.max_iterations,
        }
    }

    pub fn history(&self) -> &[ModelMessage] {
        &self.history
    }

    pub fn client(&self) -> &WorkflowClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut WorkflowClient {
        &mut self.client
    }

    /// Send one user message and run the loop to a final answer.
    ///
    /// Tool-level and transport-level failures become tool results the model
    /// can react to. Only a failing model call returns `Err`.
    pub async fn chat(&mut self, user_message: &str) -> Result<String, StagehandError> {
        self.history.push(ModelMessage::user(user_message));

        for iteration in 1..=self.max_iterations {
            let tools = self.client.tool_definitions();
            info!(
                iteration,
                mode = %self.client.mode(),
                tools = tools.len(),
                "Conversation round"
            );

            let request = ProviderRequest {
                messages: self.history.clone(),
                tools,
                temperature: None,
            };
            let response = self.provider.generate(&request).await?;

            if response.tool_calls.is_empty() {
                self.history.push(ModelMessage::assistant(response.text.clone()));
                debug!(iteration, "Final answer");
                return Ok(response.text);
            }

            self.history.push(ModelMessage::assistant_with_tool_calls(
                response.text,
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                debug!(tool = %call.name, call_id = %call.id, "Dispatching tool call");
                let outcome = self.client.dispatch(call).await;
                self.history.push(ModelMessage::tool_result(
                    call.id.clone(),
                    Value::String(outcome.content),
                    outcome.is_error,
                ));
            }
        }

        info!(max_iterations = self.max_iterations, "Iteration budget exhausted");
        Ok(MAX_ITERATIONS_FALLBACK.to_string())
    }
}
