//! `gitbuddy ask`: Answer a single question.

use gitbuddy_config::AppConfig;

use super::runtime::{self, Mode};

pub async fn run(question: &str, mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let responder = runtime::build_responder(&config, mode)?;
    let mut shell = runtime::build_shell(&config, responder);

    runtime::run_turn(&mut shell, question).await?;
    Ok(())
}
