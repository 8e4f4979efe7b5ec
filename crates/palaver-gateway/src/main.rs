//! Palaver console gateway entry point.
//!
//! Binary name: `palaver`
//!
//! Parses CLI arguments, loads configuration, builds the engine, then
//! dispatches to the selected command. The console chat loop stands in
//! for a real chat transport -- every stdin line becomes one Text task.

mod cli;
mod console;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};

use palaver_core::collab::{Messenger, Synthesizer, Transcriber};
use palaver_core::engine::Engine;
use palaver_core::pipeline::PipelineOptions;
use palaver_infra::config::{build_catalog, load_gateway_config};
use palaver_infra::llm::build_router;
use palaver_infra::speech::{GoogleSynthesizer, GoogleTranscriber};
use palaver_types::chat::ConversationId;
use palaver_types::config::{GatewayConfig, RoleConfig};
use palaver_types::task::Task;

use cli::{Cli, Commands};
use console::ConsoleMessenger;

/// The console is a single conversation.
const CONSOLE_CONVERSATION: ConversationId = ConversationId(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Map verbosity flags to a default filter unless RUST_LOG is set.
    // Safe: nothing else is running yet.
    if std::env::var_os("RUST_LOG").is_none() {
        let filter = match cli.verbose {
            0 if cli.quiet => "error",
            0 => "info",
            1 => "info,palaver_core=debug,palaver_infra=debug",
            _ => "trace",
        };
        unsafe { std::env::set_var("RUST_LOG", filter) };
    }
    palaver_observe::tracing_setup::init_tracing(cli.otel)
        .map_err(|err| anyhow::anyhow!("tracing init failed: {err}"))?;

    let data_dir = resolve_data_dir(cli.config_dir.clone());
    let config = load_gateway_config(&data_dir).await;

    match cli.command {
        Commands::Models => {
            let catalog = build_catalog(&config);
            for model in catalog.iter() {
                println!(
                    "{:<48} {:<12} {:>9} tokens  {}",
                    model.id, model.family.to_string(), model.context_tokens, model.name
                );
            }
        }

        Commands::Chat { model, workers } => {
            run_chat(config, model, workers).await?;
        }
    }

    palaver_observe::tracing_setup::shutdown_tracing();
    Ok(())
}

async fn run_chat(
    mut config: GatewayConfig,
    start_model: Option<String>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    if let Some(workers) = workers {
        config.engine.workers = workers;
    }

    let catalog = build_catalog(&config);
    let router = build_router(&config.providers);

    let google_key = std::env::var(&config.providers.google.api_key_env).unwrap_or_default();
    let transcriber = GoogleTranscriber::with_prompt(
        SecretString::from(google_key.clone()),
        &config.speech.transcription_prompt,
    );
    let synthesizer = GoogleSynthesizer::with_model(
        SecretString::from(google_key),
        &config.speech.synthesis_model,
    );

    let options = PipelineOptions {
        transcription_model: Some(config.speech.transcription_model.clone()),
        voice: config.speech.voice.clone(),
        system_instructions: role_instructions(&config.role),
    };

    let messenger = Arc::new(ConsoleMessenger::default());
    let engine = Engine::new(
        &config.engine,
        catalog,
        router,
        Arc::clone(&messenger),
        transcriber,
        synthesizer,
        options,
    )?;

    if let Some(model_id) = start_model {
        engine.select_model(CONSOLE_CONVERSATION, &model_id).await?;
    }

    let current = engine.store().model(CONSOLE_CONVERSATION).await;
    println!("palaver -- chatting with {} ({})", current.name, current.id);
    println!("commands: /models /model <id> /voice /clear /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = shutdown_signal() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" {
                    break;
                }
                if handle_command(&engine, &line).await {
                    continue;
                }

                let mut task = Task::text(CONSOLE_CONVERSATION, line);
                if let Ok(ticket) = messenger
                    .post_status(CONSOLE_CONVERSATION, "Composing an answer...")
                    .await
                {
                    task = task.with_status(ticket);
                }
                engine.submit(task);
            }
        }
    }

    println!("\nshutting down...");
    engine.shutdown().await;
    Ok(())
}

/// Handle an in-chat `/command`. Returns true when the line was a command.
async fn handle_command<M, T, S>(engine: &Engine<M, T, S>, line: &str) -> bool
where
    M: Messenger + 'static,
    T: Transcriber + 'static,
    S: Synthesizer + 'static,
{
    if line == "/models" {
        for model in engine.catalog().iter() {
            println!("  {:<48} {}", model.id, model.name);
        }
        return true;
    }
    if let Some(model_id) = line.strip_prefix("/model ") {
        match engine.select_model(CONSOLE_CONVERSATION, model_id.trim()).await {
            Ok(model) => println!("now talking to {} ({})", model.name, model.id),
            Err(err) => println!("{err}"),
        }
        return true;
    }
    if line == "/voice" {
        let on = engine.store().toggle_voice_mode(CONSOLE_CONVERSATION).await;
        println!("voice mode {}", if on { "on" } else { "off" });
        return true;
    }
    if line == "/clear" {
        engine.store().clear_history(CONSOLE_CONVERSATION).await;
        println!("history cleared");
        return true;
    }
    false
}

/// Build the persona system instructions from the role config.
fn role_instructions(role: &RoleConfig) -> Option<String> {
    match (&role.name, &role.instructions) {
        (Some(name), Some(instructions)) => {
            Some(format!("You are {name}.\n{instructions}"))
        }
        (None, Some(instructions)) => Some(instructions.clone()),
        (Some(name), None) => Some(format!("You are {name}.")),
        (None, None) => None,
    }
}

fn resolve_data_dir(override_dir: Option<PathBuf>) -> PathBuf {
    override_dir.unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".palaver")
    })
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
