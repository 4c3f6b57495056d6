//! Configuration (layered: code > env > defaults).
//!
//! Everything the orchestrator server, session manager, and client need is
//! passed in explicitly at construction; there is no process-wide config.

use std::time::Duration;

use bon::Builder;
use tracing::warn;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_MODEL: &str = "gpt-5";
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Instructions given to the model at the start of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI assistant with access to remote stage-based workflows.

You must ONLY use the tools provided to you. Do not answer from your own knowledge.

Help users accomplish tasks by:
1. Understanding what the user wants to do
2. Searching for and connecting to the appropriate remote server using search_remote_servers
3. Using ONLY the server's provided tools to complete the task
4. Disconnecting when the task is complete or when the user needs different capabilities

Rules:
- If a tool call returns an error, tell the user about the error instead of inventing an answer
- Never answer questions about data without first calling the appropriate tool
- If you don't have the right tool, search for a different server or tell the user you can't help";

/// Client-side configuration.
#[derive(Debug, Clone, Builder)]
pub struct StagehandConfig {
    /// Base URL of the workflow server (discovery + execute endpoints).
    #[builder(into, default = DEFAULT_SERVER_URL.to_string())]
    pub server_url: String,
    /// Timeout for handshake (connect) requests.
    #[builder(default = Duration::from_secs(30))]
    pub connect_timeout: Duration,
    /// Timeout for best-effort session termination.
    #[builder(default = Duration::from_secs(10))]
    pub terminate_timeout: Duration,
    /// Timeout for every other request (search, tool calls).
    #[builder(default = Duration::from_secs(30))]
    pub request_timeout: Duration,
    /// Upper bound on LLM round trips per user message.
    #[builder(default = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    #[builder(into)]
    pub llm_base_url: Option<String>,
    #[builder(into)]
    pub llm_api_key: Option<String>,
    #[builder(into, default = DEFAULT_SYSTEM_PROMPT.to_string())]
    pub system_prompt: String,
}

impl Default for StagehandConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StagehandConfig {
    /// Load from environment variables (`STAGEHAND_*`, `OPENAI_API_KEY`, `OPENAI_BASE_URL`).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("STAGEHAND_SERVER_URL") {
            config.server_url = url;
        }
        if let Some(model) = lookup("STAGEHAND_MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("STAGEHAND_MAX_ITERATIONS") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.max_iterations = n,
                _ => warn!(value = %raw, "Ignoring invalid STAGEHAND_MAX_ITERATIONS"),
            }
        }
        if let Some(raw) = lookup("STAGEHAND_CONNECT_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => config.connect_timeout = Duration::from_secs(secs),
                Err(_) => warn!(value = %raw, "Ignoring invalid STAGEHAND_CONNECT_TIMEOUT_SECS"),
            }
        }
        config.llm_api_key = lookup("OPENAI_API_KEY");
        config.llm_base_url = lookup("OPENAI_BASE_URL");

        config
    }
}

/// Server-side orchestrator configuration.
#[derive(Debug, Clone, Default, Builder)]
pub struct OrchestratorConfig {
    /// Sessions idle longer than this are dropped by `Orchestrator::reap_idle`.
    pub session_idle_timeout: Option<Duration>,
}
