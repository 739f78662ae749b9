//! `agent-brain`: a thin CLI over the agent-brain HTTP API plus local
//! filesystem/process bookkeeping for project lifecycle management.

mod client;
mod commands;
mod discovery;
mod error;

use clap::{Parser, Subcommand};

use client::ApiClient;
use error::{CliError, CliResult};

/// Manage and query an agent-brain project.
#[derive(Parser, Debug)]
#[command(name = "agent-brain", author, version, about)]
struct Cli {
    /// Emit machine-readable JSON instead of human-formatted text.
    #[arg(long, global = true)]
    json: bool,

    /// Override server discovery; also settable via $AGENT_BRAIN_URL.
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scaffold `.claude/agent-brain/` for the current project.
    Init,
    /// Start the server for the current project, detached.
    Start,
    /// Stop the running server for the current project.
    Stop,
    /// List known projects and whether each server is live.
    List,
    /// Show aggregate server status.
    Status,
    /// Run a query against the indexed project.
    Query {
        text: String,
        #[arg(long, default_value = "hybrid")]
        mode: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Enqueue an indexing job for a folder.
    Index { folder: String },
    /// Inspect or manage indexing jobs.
    Jobs {
        id: Option<String>,
        #[arg(long)]
        watch: bool,
        #[arg(long)]
        cancel: bool,
    },
    /// Clear the index and graph for the current project.
    Reset,
}

#[tokio::main]
async fn main() {
    agentbrain_common::initialize_environment();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = dispatch(cli).await {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Command::Init => commands::init::run(&cwd, cli.json).await,
        Command::Start => commands::start::run(&cwd, cli.json).await,
        Command::Stop => commands::stop::run(&cwd, cli.json).await,
        Command::List => commands::list::run(cli.json).await,
        Command::Status => {
            let client = connect(&cli.url, &cwd)?;
            commands::status::run(&client, cli.json).await
        }
        Command::Query { text, mode, top_k } => {
            let client = connect(&cli.url, &cwd)?;
            commands::query::run(&client, commands::query::QueryArgs { text, mode, top_k }, cli.json).await
        }
        Command::Index { folder } => {
            let client = connect(&cli.url, &cwd)?;
            commands::index::run(&client, &folder, cli.json).await
        }
        Command::Jobs { id, watch, cancel } => {
            if watch && cancel {
                return Err(CliError::Usage("--watch and --cancel are mutually exclusive".to_string()));
            }
            let client = connect(&cli.url, &cwd)?;
            commands::jobs::run(&client, commands::jobs::JobsArgs { id, watch, cancel }, cli.json).await
        }
        Command::Reset => {
            let client = connect(&cli.url, &cwd)?;
            commands::reset::run(&client, cli.json).await
        }
    }
}

fn connect(explicit_url: &Option<String>, cwd: &std::path::Path) -> CliResult<ApiClient> {
    let base_url = discovery::resolve_base_url(explicit_url.as_deref(), cwd)?;
    Ok(ApiClient::new(base_url))
}
