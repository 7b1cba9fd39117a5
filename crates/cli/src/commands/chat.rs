//! `gitbuddy chat`: Interactive session.

use gitbuddy_agent::shell::GREETING;
use gitbuddy_config::AppConfig;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::runtime::{self, Mode};

pub async fn run(mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let responder = runtime::build_responder(&config, mode)?;
    let mut shell = runtime::build_shell(&config, responder);

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║                  Git Buddy                   ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Answering: {}", mode.label());
    println!("  Session:   {}", shell.session());
    println!();
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();
    println!("{GREETING}");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = match read_line(&line) {
            Line::Blank => continue,
            Line::Exit => break,
            Line::Question(question) => question,
        };

        if let Err(e) = runtime::run_turn(&mut shell, question).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Exit,
    Question(&'a str),
}

/// Classify an input line. Questions are passed on as entered, so the
/// shell measures the length the user typed.
fn read_line(line: &str) -> Line<'_> {
    let command = line.trim();
    if command.is_empty() {
        Line::Blank
    } else if command.eq_ignore_ascii_case("exit") || command.eq_ignore_ascii_case("quit") {
        Line::Exit
    } else {
        Line::Question(line)
    }
}
