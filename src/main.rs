mod client;
mod config;
mod repl;
mod tools;
mod types;

use client::ChatClient;
use client::io::Terminal;
use config::Config;
use tools::local_toolset;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Chat with Gemini from the terminal. The model can ask for the time,
/// open pages in the browser, find files, empty the trash, and analyze or
/// generate images.
#[derive(Parser, Debug)]
#[command(name = "chap", version, about)]
struct Cli {
    /// Config file (default: <config dir>/chap/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Chat model, overrides the config file
    #[arg(short, long)]
    model: Option<String>,

    /// Wait for whole replies instead of streaming them
    #[arg(long)]
    no_stream: bool,

    /// System instruction for the conversation
    #[arg(long, value_name = "TEXT")]
    system: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "chap=warn",
        1 => "chap=info",
        _ => "chap=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("could not load configuration")?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if cli.no_stream {
        config.stream = false;
    }
    if let Some(system) = cli.system {
        config.system_prompt = Some(system);
    }
    info!(model = %config.model, stream = config.stream, "starting chat");

    let toolset = local_toolset().context("invalid tool definitions")?;
    let terminal = Terminal::new();
    let mut client = ChatClient::new(Arc::new(config), toolset, terminal.clone());
    repl::run(&mut client, &terminal).await
}
