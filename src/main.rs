//! Stagehand CLI binary entry point.

use stagehand::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    stagehand::cli::init_tracing();
    let cli = Cli::parse_args();

    let result = match cli.command {
        Commands::Serve(args) => stagehand::cli::handle_serve(args).await,
        Commands::Chat(args) => stagehand::cli::handle_chat(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
