//! Stage model.
//!
//! A stage is one named state of a workflow. Its tool set and transition set
//! are fixed once built; only the per-session [`LocalState`] changes at runtime.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use crate::tools::{StageTool, ToolContext, ToolOutput};
use crate::tools::ToolDescriptor;

/// An immutable stage definition.
#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    description: String,
    prerequisites: Vec<String>,
    tools: Vec<StageTool>,
    transitions: Vec<String>,
    initial_state: Map<String, Value>,
}

impl Stage {
    pub fn builder(name: impl Into<String>) -> StageBuilder {
        StageBuilder {
            stage: Stage {
                name: name.into(),
                description: String::new(),
                prerequisites: Vec::new(),
                tools: Vec::new(),
                transitions: Vec::new(),
                initial_state: Map::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Stages that must have been visited before this one can be entered.
    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    /// Tools in registration order.
    pub fn tools(&self) -> &[StageTool] {
        &self.tools
    }

    pub fn tool(&self, name: &str) -> Option<&StageTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(StageTool::name)
    }

    pub fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(StageTool::descriptor).collect()
    }

    /// Transition targets in declaration order.
    pub fn transitions(&self) -> &[String] {
        &self.transitions
    }

    pub fn can_transition_to(&self, target: &str) -> bool {
        self.transitions.iter().any(|t| t == target)
    }

    /// Local state a session starts with on first entry.
    pub fn initial_state(&self) -> LocalState {
        LocalState::from_map(self.initial_state.clone())
    }
}

/// Builder for [`Stage`]. Registration order of tools and transitions is kept.
pub struct StageBuilder {
    stage: Stage,
}

impl StageBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.stage.description = description.into();
        self
    }

    pub fn prerequisite(mut self, stage: impl Into<String>) -> Self {
        self.stage.prerequisites.push(stage.into());
        self
    }

    pub fn tool(mut self, tool: StageTool) -> Self {
        self.stage.tools.push(tool);
        self
    }

    pub fn transition(mut self, target: impl Into<String>) -> Self {
        self.stage.transitions.push(target.into());
        self
    }

    pub fn initial_state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.stage.initial_state.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Stage {
        self.stage
    }
}

/// Key/value state scoped to one stage of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalState(Map<String, Value>);

impl LocalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert or overwrite every key in `updates`.
    pub fn merge(&mut self, updates: Map<String, Value>) {
        for (key, value) in updates {
            self.0.insert(key, value);
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// JSON rendering used in presentations; `{}` when empty.
    pub fn to_json_string(&self) -> String {
        crate::presentation::json::to_display_string(&self.0)
    }
}
