//! Stage tools: named callables registered with explicit metadata.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use super::arguments::ToolArguments;
use super::types::{ToolDescriptor, ToolParameters};
use crate::error::StagehandError;

/// Session snapshot handed to a tool handler.
///
/// Handlers never see live session state; changes go back through
/// [`ToolOutput::state_updates`].
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub session_id: String,
    pub workflow: String,
    pub stage: String,
    pub state: Map<String, Value>,
}

impl ToolContext {
    pub fn get_state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }
}

/// What a tool handler returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub result: String,
    /// Merged into the current stage's local state once the call completes.
    pub state_updates: Map<String, Value>,
}

impl ToolOutput {
    pub fn text(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            state_updates: Map::new(),
        }
    }

    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state_updates.insert(key.into(), value.into());
        self
    }
}

type ToolHandler = dyn Fn(ToolContext, ToolArguments) -> BoxFuture<'static, Result<ToolOutput, StagehandError>>
    + Send
    + Sync;

/// A callable registered on a stage.
#[derive(Clone)]
pub struct StageTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl StageTool {
    /// Create a tool from an async closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolContext, ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput, StagehandError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |ctx, args| Box::pin(handler(ctx, args))),
        }
    }

    /// Create a tool from a synchronous closure.
    pub fn sync<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(&ToolContext, &ToolArguments) -> Result<ToolOutput, StagehandError>
            + Send
            + Sync
            + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(name, description, parameters, move |ctx, args| {
            let handler = Arc::clone(&handler);
            async move { handler(&ctx, &args) }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.parameters.schema.clone(),
        }
    }

    /// Run the handler. Any failure comes back as [`StagehandError::ToolExecution`].
    pub async fn invoke(
        &self,
        ctx: ToolContext,
        args: ToolArguments,
    ) -> Result<ToolOutput, StagehandError> {
        (self.handler)(ctx, args).await.map_err(|e| match e {
            StagehandError::ToolExecution { .. } => e,
            other => StagehandError::tool(&self.name, other.to_string()),
        })
    }
}

impl std::fmt::Debug for StageTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sync_tool_reads_arguments_and_state() {
        let tool = StageTool::sync(
            "track_rent_comps",
            "Track competitive rent pricing",
            ToolParameters::object()
                .string("property_id", "Property", true)
                .build(),
            |ctx, args| {
                let id = args.get_str("property_id")?;
                let market = ctx.get_state("market").and_then(|v| v.as_str()).unwrap_or("?");
                Ok(ToolOutput::text(format!("{id} in {market}")))
            },
        );

        let mut state = Map::new();
        state.insert("market".into(), json!("Austin"));
        let ctx = ToolContext {
            state,
            ..Default::default()
        };
        let output = tool
            .invoke(ctx, ToolArguments::new(json!({"property_id": "A"})))
            .await
            .unwrap();
        assert_eq!(output.result, "A in Austin");
    }

    #[tokio::test]
    async fn handler_errors_are_tagged_with_tool_name() {
        let tool = StageTool::sync("needs_arg", "", ToolParameters::empty(), |_, args| {
            args.get_str("x").map(ToolOutput::text)
        });

        let err = tool
            .invoke(ToolContext::default(), ToolArguments::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StagehandError::ToolExecution { ref tool_name, ref message }
            if tool_name == "needs_arg" && message.contains("'x'")
        ));
    }

    #[test]
    fn descriptor_carries_schema() {
        let tool = StageTool::sync("noop", "Does nothing", ToolParameters::empty(), |_, _| {
            Ok(ToolOutput::default())
        });
        let descriptor = tool.descriptor();
        assert_eq!(descriptor.name, "noop");
        assert_eq!(descriptor.input_schema["type"], "object");
    }
}
