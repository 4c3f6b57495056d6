//! CLI surface for Stagehand.

use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::client::{LocalTransport, WorkflowClient};
use crate::config::{OrchestratorConfig, StagehandConfig};
use crate::conversation::Conversation;
use crate::demo;
use crate::error::StagehandError;
use crate::orchestrator::Orchestrator;
use crate::provider::create_provider;

/// Typing this (any case) ends the prompt loop.
pub const EXIT_KEYWORD: &str = "exit";

/// Stagehand CLI
#[derive(Parser, Debug)]
#[command(name = "stagehand", version, about = "Stage-based workflow sessions for LLM agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Host the demo workflows over HTTP
    Serve(ServeArgs),
    /// Chat with an assistant that drives remote workflows
    Chat(ChatArgs),
}

/// Arguments for `stagehand serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Drop sessions idle for this many seconds
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,
}

/// Arguments for `stagehand chat`.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Run the demo workflows in-process instead of calling a server
    #[arg(long)]
    pub local: bool,

    /// Model id (overrides STAGEHAND_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Model round trips allowed per message
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Workflow server base URL (overrides STAGEHAND_SERVER_URL)
    #[arg(long)]
    pub server_url: Option<String>,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stagehand=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn handle_serve(args: ServeArgs) -> Result<(), StagehandError> {
    let addr = SocketAddr::new(args.host, args.port);
    let registry = demo::registry(&format!("http://{addr}"))?;
    let config = OrchestratorConfig {
        session_idle_timeout: args.idle_timeout_secs.map(Duration::from_secs),
    };
    let orchestrator = Arc::new(Orchestrator::with_config(registry, config));
    crate::server::serve(orchestrator, addr).await
}

pub async fn handle_chat(args: ChatArgs) -> Result<(), StagehandError> {
    let mut config = StagehandConfig::from_env();
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(max) = args.max_iterations {
        config.max_iterations = max;
    }
    if let Some(url) = args.server_url {
        config.server_url = url;
    }

    let provider = create_provider(&config)?;
    let client = if args.local {
        let orchestrator = Arc::new(Orchestrator::new(demo::registry(&config.server_url)?));
        WorkflowClient::new(Arc::new(LocalTransport::new(orchestrator)), &config)
    } else {
        WorkflowClient::http(&config)
    };
    info!(
        model = %config.model,
        server_url = %config.server_url,
        local = args.local,
        "Starting chat"
    );

    let mut conversation = Conversation::new(provider, client, &config);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    prompt_loop(&mut conversation, stdin, &mut stdout).await
}

/// Read lines from `input` until EOF or the exit keyword, answering each one.
///
/// Blank lines are skipped. A failed turn is printed and the loop continues.
/// Any open connection is closed on the way out.
pub async fn prompt_loop<R, W>(
    conversation: &mut Conversation,
    input: R,
    output: &mut W,
) -> Result<(), StagehandError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(output, "Type '{EXIT_KEYWORD}' to quit.")?;
    let mut lines = input.lines();
    loop {
        write!(output, "\nYou: ")?;
        output.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case(EXIT_KEYWORD) {
            break;
        }
        match conversation.chat(line).await {
            Ok(reply) => writeln!(output, "\nAssistant: {reply}")?,
            Err(err) => writeln!(output, "\nError: {err}")?,
        }
    }
    conversation.client_mut().disconnect().await;
    Ok(())
}
