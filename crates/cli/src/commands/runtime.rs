//! Runtime wiring shared by `chat` and `ask`: builds the responder from
//! configuration and renders a turn's stream to the terminal.

use gitbuddy_agent::{
    AgentStreamEvent, ChatShell, RagResponder, RateLimiter, ReactAgent, Responder, ShellLimits,
    SourceExtractor, SourceSettings, TokenBudget, Tokenizer, TurnOutcome, TurnSink,
};
use gitbuddy_config::{AppConfig, ConfigError, Secrets};
use gitbuddy_core::{Provider, SearchEngine, VectorStore};
use gitbuddy_memory::{PineconeStore, WindowMemory};
use gitbuddy_providers::OpenAiCompatProvider;
use gitbuddy_tools::{DocumentRetrieverTool, DuckDuckGoSearch, RetrieverSettings, default_registry};
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Which responder answers the questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Rag,
    Agent,
}

impl Mode {
    pub fn from_flag(agent: bool) -> Self {
        if agent { Mode::Agent } else { Mode::Rag }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Rag => "retrieval-augmented responder",
            Mode::Agent => "ReAct agent",
        }
    }
}

/// Both API keys, or setup instructions and an error.
pub fn require_secrets(config: &AppConfig) -> Result<Secrets, ConfigError> {
    config.require_secrets().inspect_err(|e| {
        eprintln!();
        eprintln!("  ERROR: {e}");
        eprintln!();
        eprintln!("  Git Buddy needs both of these:");
        eprintln!("    export OPENAI_API_KEY='sk-...'");
        eprintln!("    export PINECONE_API_KEY='...'");
        eprintln!();
        eprintln!("  Or add them to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
    })
}

/// Build the responder for `mode` from configuration.
pub fn build_responder(
    config: &AppConfig,
    mode: Mode,
) -> Result<Arc<dyn Responder>, Box<dyn std::error::Error>> {
    let secrets = require_secrets(config)?;

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::new(
        "openai",
        config.api_url.clone(),
        secrets.openai_api_key,
    )?);
    let store: Arc<dyn VectorStore> = Arc::new(PineconeStore::new(
        &config.index.host,
        secrets.pinecone_api_key,
        provider.clone(),
        config.embeddings_model.clone(),
    )?);
    let engine: Arc<dyn SearchEngine> =
        Arc::new(DuckDuckGoSearch::new(config.search.base_url.clone())?);

    let tokenizer = Tokenizer::cl100k()?;
    let limiter = RateLimiter::from(&config.rate_limit);
    let budget = TokenBudget::from(&config.budget);

    debug!(mode = mode.label(), model = %config.model, "Building responder");

    let responder: Arc<dyn Responder> = match mode {
        Mode::Rag => {
            let sources = SourceExtractor::new(engine)
                .with_settings(SourceSettings::from_config(&config.sources, &config.search));
            Arc::new(
                RagResponder::new(provider, store, sources, tokenizer)
                    .with_model(config.model.clone(), config.temperature)
                    .with_memory(Arc::new(WindowMemory::new(config.memory.rag_window)))
                    .with_rate_limiter(limiter)
                    .with_budget(budget)
                    .with_top_k(config.index.top_k),
            )
        }
        Mode::Agent => {
            let retriever = DocumentRetrieverTool::new(
                store,
                provider.clone(),
                RetrieverSettings {
                    model: config.model.clone(),
                    temperature: config.temperature,
                    top_k: config.index.top_k,
                },
            );
            let tools = Arc::new(default_registry(engine, config.search.max_results, retriever));
            Arc::new(
                ReactAgent::new(provider, config.model.clone(), tools, tokenizer)
                    .with_temperature(config.temperature)
                    .with_memory(Arc::new(WindowMemory::new(config.memory.agent_window)))
                    .with_budget(budget)
                    .with_max_iterations(config.agent.max_iterations)
                    .with_retrieval_first(config.agent.retrieval_first)
                    .with_rate_limiter(limiter),
            )
        }
    };

    Ok(responder)
}

/// A shell over `responder` with the configured length limits.
pub fn build_shell(config: &AppConfig, responder: Arc<dyn Responder>) -> ChatShell {
    ChatShell::new(responder).with_limits(ShellLimits::from(&config.shell))
}

/// Submit one question and print the reply as it streams.
pub async fn run_turn(shell: &mut ChatShell, input: &str) -> gitbuddy_core::Result<TurnOutcome> {
    let (sink, mut rx) = TurnSink::channel(64);

    let printer = tokio::spawn(async move {
        let mut streamed = false;
        while let Some(event) = rx.recv().await {
            match event {
                AgentStreamEvent::Chunk { content } => {
                    print!("{content}");
                    let _ = std::io::stdout().flush();
                    streamed = true;
                }
                AgentStreamEvent::ToolCall { name, input, .. } => {
                    eprintln!("  → {name}: {input}");
                }
                AgentStreamEvent::Thought { content } => debug!(%content, "Thought"),
                AgentStreamEvent::Sources { links } => debug!(?links, "Source links"),
                _ => {}
            }
        }
        streamed
    });

    let outcome = shell.submit(input, &sink).await;
    drop(sink);
    let streamed = printer.await.unwrap_or(false);

    if let Ok(outcome) = &outcome {
        if !streamed {
            print!("{}", outcome.text());
        }
        println!();
    }
    outcome
}
