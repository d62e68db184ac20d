use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use runbook_config::{ConfigLoader, LoggingConfig, RunbookConfig, ShellMode};
use runbook_core::{Result, RunbookError};

mod chat;
mod emulate;
mod tasks;

/// Runbook: a conversational assistant that turns chat into shell tasks
#[derive(Parser)]
#[command(name = "runbook", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to runbook.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Run shell commands against the emulator instead of the host
    #[arg(long, global = true)]
    emulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat in the terminal
    Chat,
    /// Send a single message and print the replies
    Send {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Send a voice message (audio file under 2MB)
    Transcribe {
        /// Audio file, e.g. note.ogg
        file: PathBuf,
        /// Print the transcript without running the assistant
        #[arg(long)]
        text_only: bool,
    },
    /// Inspect and manage stored tasks
    Tasks {
        #[command(subcommand)]
        action: TaskCommand,
    },
    /// Try commands against the shell emulator
    Emulate,
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// List stored tasks
    List,
    /// Show a task's goal, context and commands
    Show { name: String },
    /// Delete a task
    Delete {
        name: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        // Load config first so we can use it for log format; its warnings
        // are held until the subscriber exists.
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let mut config = config_loader.get();
        if self.emulate {
            config.shell.mode = ShellMode::Emulated;
        }

        // Resolve log level: --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(&config.logging.level)
        };
        init_tracing(&config.logging, log_level);
        config_loader.log_warnings();

        match self.command {
            Commands::Chat => chat::cmd_chat(config).await,
            Commands::Send { text } => chat::cmd_send(config, &text.join(" ")).await,
            Commands::Transcribe { file, text_only } => {
                chat::cmd_transcribe(config, &file, text_only).await
            }
            Commands::Tasks { action } => match action {
                TaskCommand::List => tasks::cmd_list(&config).await,
                TaskCommand::Show { name } => tasks::cmd_show(&config, &name).await,
                TaskCommand::Delete { name, yes } => tasks::cmd_delete(&config, &name, yes).await,
            },
            Commands::Emulate => emulate::cmd_emulate().await,
            Commands::Config { json } => Self::cmd_config(&config, json),
            Commands::Completions { shell } => Self::cmd_completions(shell),
        }
    }

    fn cmd_config(config: &RunbookConfig, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(config).map_err(|e| RunbookError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "runbook", &mut std::io::stdout());
        Ok(())
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
fn init_tracing(logging: &LoggingConfig, level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format.as_str() {
        "json" => builder.json().with_target(true).init(),
        "compact" => builder.compact().with_target(false).init(),
        _ => builder.with_target(false).init(),
    }
}
