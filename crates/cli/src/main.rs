//! Git Buddy CLI: the main entry point.
//!
//! Commands:
//! - `chat`: Interactive session (RAG responder, or the agent with `--agent`)
//! - `ask`: Answer a single question
//! - `docs`: List the documentation Git Buddy answers from
//! - `doctor`: Diagnose configuration
//! - `init`: Write a default configuration file

use clap::{Parser, Subcommand};

mod commands;

use commands::runtime::Mode;

#[derive(Parser)]
#[command(
    name = "gitbuddy",
    about = "Git Buddy: learn Git, GitHub, and TortoiseGit by asking",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Answer with the ReAct agent instead of the RAG responder
        #[arg(long)]
        agent: bool,
    },

    /// Ask a single question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Answer with the ReAct agent instead of the RAG responder
        #[arg(long)]
        agent: bool,
    },

    /// List the documentation sources
    Docs,

    /// Diagnose configuration
    Doctor,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the answers.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { agent } => commands::chat::run(Mode::from_flag(agent)).await?,
        Commands::Ask { question, agent } => {
            commands::ask::run(&question.join(" "), Mode::from_flag(agent)).await?
        }
        Commands::Docs => commands::docs::run(),
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Init { force } => commands::init::run(force)?,
    }

    Ok(())
}
