//! Workflows: immutable stage tables built once at startup, plus discovery.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StagehandError;
use crate::orchestrator::action::RESERVED_TOOL_NAMES;
use crate::stage::Stage;

/// A named graph of stages with a designated entry stage.
#[derive(Debug)]
pub struct Workflow {
    name: String,
    description: String,
    entry: String,
    stages: Vec<Stage>,
    index: HashMap<String, usize>,
}

impl Workflow {
    pub fn builder(name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder {
            name: name.into(),
            description: String::new(),
            entry: None,
            stages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn entry_stage(&self) -> &Stage {
        // `build` guarantees the entry stage exists.
        &self.stages[self.index[&self.entry]]
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

/// Builder for [`Workflow`]; `build` validates the stage graph.
pub struct WorkflowBuilder {
    name: String,
    description: String,
    entry: Option<String>,
    stages: Vec<Stage>,
}

impl WorkflowBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Designate the entry stage. Defaults to the first registered stage.
    pub fn entry(mut self, stage: impl Into<String>) -> Self {
        self.entry = Some(stage.into());
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Result<Workflow, StagehandError> {
        let invalid = |msg: String| StagehandError::Configuration(format!("workflow '{}': {msg}", self.name));

        let mut index = HashMap::with_capacity(self.stages.len());
        for (i, stage) in self.stages.iter().enumerate() {
            if index.insert(stage.name().to_string(), i).is_some() {
                return Err(invalid(format!("duplicate stage '{}'", stage.name())));
            }
        }

        for stage in &self.stages {
            let mut seen = HashSet::new();
            for tool in stage.tool_names() {
                if RESERVED_TOOL_NAMES.contains(&tool) {
                    return Err(invalid(format!(
                        "stage '{}' registers reserved tool name '{tool}'",
                        stage.name()
                    )));
                }
                if !seen.insert(tool) {
                    return Err(invalid(format!(
                        "stage '{}' registers tool '{tool}' twice",
                        stage.name()
                    )));
                }
            }
            for target in stage.transitions() {
                if !index.contains_key(target) {
                    return Err(invalid(format!(
                        "stage '{}' transitions to unknown stage '{target}'",
                        stage.name()
                    )));
                }
            }
            for prereq in stage.prerequisites() {
                if !index.contains_key(prereq) {
                    return Err(invalid(format!(
                        "stage '{}' requires unknown stage '{prereq}'",
                        stage.name()
                    )));
                }
            }
        }

        let entry = match self.entry.clone() {
            Some(entry) => entry,
            None => self
                .stages
                .first()
                .map(|s| s.name().to_string())
                .ok_or_else(|| invalid("no stages registered".into()))?,
        };
        if !index.contains_key(&entry) {
            return Err(invalid(format!("unknown entry stage '{entry}'")));
        }

        Ok(Workflow {
            name: self.name,
            description: self.description,
            entry,
            stages: self.stages,
            index,
        })
    }
}

/// Discovery record for a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Base URL of the server hosting the workflow.
    #[serde(default)]
    pub url: String,
}

/// Immutable table of the workflows a server hosts.
#[derive(Debug, Clone)]
pub struct WorkflowRegistry {
    base_url: String,
    workflows: Vec<Arc<Workflow>>,
}

impl WorkflowRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            workflows: Vec::new(),
        }
    }

    pub fn register(mut self, workflow: Workflow) -> Result<Self, StagehandError> {
        if self.get(workflow.name()).is_some() {
            return Err(StagehandError::Configuration(format!(
                "workflow '{}' registered twice",
                workflow.name()
            )));
        }
        self.workflows.push(Arc::new(workflow));
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Workflow>> {
        self.workflows.iter().find(|w| w.name() == name).cloned()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn descriptors(&self) -> Vec<WorkflowDescriptor> {
        self.workflows.iter().map(|w| self.describe(w)).collect()
    }

    /// Case-insensitive keyword search over names and descriptions.
    ///
    /// A workflow matches when any whitespace-separated term occurs in its
    /// name or description. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<WorkflowDescriptor> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return self.descriptors();
        }
        self.workflows
            .iter()
            .filter(|w| {
                let haystack = format!("{} {}", w.name(), w.description()).to_lowercase();
                terms.iter().any(|term| haystack.contains(term.as_str()))
            })
            .map(|w| self.describe(w))
            .collect()
    }

    fn describe(&self, workflow: &Workflow) -> WorkflowDescriptor {
        WorkflowDescriptor {
            name: workflow.name().to_string(),
            description: workflow.description().to_string(),
            url: self.base_url.clone(),
        }
    }
}
