use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncBufReadExt;
use tracing::error;

use runbook_config::{RunbookConfig, ShellMode};
use runbook_core::{Result, RunbookError};
use runbook_runtime::Assistant;

const WELCOME_MESSAGE: &str = "
Welcome to Runbook!
To get started, type your message or use one of these commands:
/start - Display this welcome message
/quit - Exit the program
";

const REFUSAL_MESSAGE: &str =
    "Could not process request. The underlying LLM might be refusing to take notes on this content.";

pub(super) async fn cmd_chat(config: RunbookConfig) -> Result<()> {
    let assistant = build_assistant(config).await;
    println!("{WELCOME_MESSAGE}");

    let stdin = tokio::io::stdin();
    let mut lines = tokio::io::BufReader::new(stdin).lines();

    loop {
        print!("{} ", style("You:").cyan().bold());
        std::io::stdout().flush().ok();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => {
                println!("\nGoodbye!");
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.starts_with('/') {
            match input {
                "/start" => println!("{WELCOME_MESSAGE}"),
                "/quit" => {
                    println!("Goodbye!");
                    break;
                }
                other => println!("Unknown command: {other}"),
            }
            continue;
        }

        let spinner = spinner("Processing your message...");
        let result = assistant.process_text(input).await;
        spinner.finish_and_clear();

        match result {
            Ok(replies) => print_replies(&replies),
            Err(e) if e.is_refusal() => {
                println!("{REFUSAL_MESSAGE}");
                error!(error = %e, "error processing text");
            }
            Err(e) => {
                println!("{} {e}", style("An error occurred:").red());
                error!(error = %e, "error processing text");
            }
        }
    }

    Ok(())
}

pub(super) async fn cmd_send(config: RunbookConfig, text: &str) -> Result<()> {
    let assistant = build_assistant(config).await;
    let spinner = spinner("Processing your message...");
    let result = assistant.process_text(text).await;
    spinner.finish_and_clear();
    finish(result)
}

pub(super) async fn cmd_transcribe(config: RunbookConfig, file: &Path, text_only: bool) -> Result<()> {
    let audio = std::fs::read(file)
        .with_context(|| format!("failed to read audio file {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio.ogg".into());

    if text_only {
        let assistant = Assistant::from_config(config);
        let Some(transcriber) = assistant.transcriber() else {
            return Err(RunbookError::Transcription(
                "no transcription service configured (set OPENAI_API_KEY)".into(),
            ));
        };
        println!("{}", transcriber.transcribe(audio, &file_name).await?);
        return Ok(());
    }

    let assistant = build_assistant(config).await;
    let spinner = spinner("Transcribing your message...");
    let result = assistant.process_audio(audio, &file_name).await;
    spinner.finish_and_clear();
    finish(result)
}

/// Build the assistant and warn about missing credentials up front.
async fn build_assistant(config: RunbookConfig) -> Assistant {
    let emulated = config.shell.mode == ShellMode::Emulated;
    let assistant = Assistant::from_config(config);

    if let Err(e) = assistant.provider().health_check().await {
        eprintln!("{} {e}", style("warning:").yellow().bold());
        eprintln!("   Add to [services] in runbook.toml:  anthropic_api_key = \"sk-ant-...\"");
        eprintln!("   Or set env var: export ANTHROPIC_API_KEY=sk-ant-...");
        eprintln!();
    }
    if emulated {
        eprintln!("{}", style("Shell commands run against the emulator.").dim());
    }
    assistant
}

fn finish(result: Result<Vec<String>>) -> Result<()> {
    match result {
        Ok(replies) => {
            print_replies(&replies);
            Ok(())
        }
        Err(e) if e.is_refusal() => {
            println!("{REFUSAL_MESSAGE}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn print_replies(replies: &[String]) {
    for reply in replies {
        println!("\n{} {reply}\n", style("Response:").green().bold());
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(template);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
