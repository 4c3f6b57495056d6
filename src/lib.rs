//! Stagehand: stage-based workflow sessions for LLM agents.
//!
//! A workflow is a graph of named stages. Each stage scopes a set of callable
//! tools, a set of legal transitions, and a local state container. The
//! [`orchestrator`] drives one session per client through that graph, and the
//! [`client`] + [`conversation`] modules bridge the protocol into a generic
//! LLM tool-calling loop.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use stagehand::prelude::*;
//!
//! # async fn example() -> stagehand::error::Result<()> {
//! let config = StagehandConfig::default();
//! let registry = stagehand::demo::registry(&config.server_url)?;
//! let orchestrator = Arc::new(Orchestrator::new(registry));
//! let transport = Arc::new(stagehand::client::LocalTransport::new(orchestrator));
//! let client = WorkflowClient::new(transport, &config);
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod demo;
pub mod error;
pub mod orchestrator;
pub mod prelude;
pub mod presentation;
pub mod provider;
pub mod stage;
pub mod tools;
pub mod types;
pub mod util;
pub mod workflow;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;
