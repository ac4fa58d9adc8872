//! ap - ask an LLM agent to work inside a sandbox directory

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use agentpen::agent::{Agent, AgentEvent};
use agentpen::cli::{Cli, generate_after_help};
use agentpen::config::{Config, ScriptConfig};
use agentpen::llm::create_client;
use agentpen::tools::ToolDispatcher;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agentpen")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("agentpen.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Print progress lines until the agent drops its sender
async fn print_events(mut rx: mpsc::UnboundedReceiver<AgentEvent>, verbose: bool) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = event.render(verbose) {
            println!("{}", line);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help(&ScriptConfig::default().interpreter));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    if let Some(root) = &cli.root {
        debug!(?root, "main: sandbox root overridden on the command line");
        config.sandbox.root = root.clone();
    }
    config.validate()?;
    info!(root = ?config.sandbox.root, model = %config.llm.model, "agentpen starting");

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let dispatcher = ToolDispatcher::new(config.sandbox.to_settings()).with_verbose(cli.verbose);

    let (tx, rx) = mpsc::unbounded_channel();
    let mut agent = Agent::new(llm, dispatcher)
        .with_max_turns(config.agent.max_turns)
        .with_max_tokens(config.llm.max_tokens)
        .with_events(tx);
    if let Some(system_prompt) = &config.agent.system_prompt {
        agent = agent.with_system_prompt(system_prompt);
    }

    let printer = tokio::spawn(print_events(rx, cli.verbose));

    // Dropping the run future kills any script still running
    let result = tokio::select! {
        result = agent.run(&cli.prompt) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    drop(agent);
    let _ = printer.await;

    match result {
        None => {
            info!("Interrupted by user");
            println!("\n{}", "Interrupted by user".yellow());
            Ok(())
        }
        Some(Ok(outcome)) => {
            info!(turns = outcome.turns, input_tokens = outcome.usage.input_tokens, output_tokens = outcome.usage.output_tokens, "Run finished");
            if let Some(text) = &outcome.final_text {
                println!("{}", text);
            }
            if cli.verbose {
                let summary = format!(
                    "Total: {} turns, {} prompt tokens, {} response tokens",
                    outcome.turns, outcome.usage.input_tokens, outcome.usage.output_tokens
                );
                println!("{}", summary.dimmed());
            }
            Ok(())
        }
        Some(Err(e)) => Err(e.into()),
    }
}
