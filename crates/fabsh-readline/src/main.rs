use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use fabsh_core::command::{EchoCommand, LogCommand, SessionInfoCommand, SubscribeCommand};
use fabsh_core::{Command, CommandSet, DeferredCleanups, ShellConfig, WorkScheduler};
use fabsh_execution::{EventProcessor, OutputCoordinator, TerminalLogLayer};
use fabsh_infrastructure::{ConfigService, HistoryStore};
use fabsh_readline::{EditorLineSource, InteractiveSession, STOP_COMMAND, StopReason};

#[derive(Parser)]
#[command(name = "fabsh")]
#[command(about = "Interactive command shell for a long-running device-management process", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/fabsh/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage directory; also holds the history file
    #[arg(long)]
    storage_directory: Option<PathBuf>,

    /// Whether dispatched commands advertise operationally
    #[arg(long)]
    advertise_operational: Option<bool>,

    /// Log filter directive, e.g. `debug` or `fabsh=trace`
    #[arg(long)]
    log_level: Option<String>,

    /// Prompt shown before each command
    #[arg(long)]
    prompt: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut ShellConfig) {
        if let Some(dir) = &self.storage_directory {
            config.storage_directory = Some(dir.clone());
        }
        if let Some(advertise) = self.advertise_operational {
            config.advertise_operational = Some(advertise);
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(prompt) = &self.prompt {
            config.prompt = prompt.clone();
        }
    }
}

fn init_tracing(
    cli_level: Option<&str>,
    config_level: &str,
    output: OutputCoordinator,
) -> Result<()> {
    // --log-level beats RUST_LOG, which beats the config file.
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(config_level))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(TerminalLogLayer::new(output))
        .try_init()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigService::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let output = OutputCoordinator::stdout();
    init_tracing(cli.log_level.as_deref(), &config.log_level, output.clone())?;

    // ===== Event processor =====
    let processor = EventProcessor::start()?;
    let handle = processor.handle();
    let scheduler: Arc<dyn WorkScheduler> = Arc::new(handle.clone());

    let cleanups = Arc::new(DeferredCleanups::new());
    cleanups.register(
        "flush-terminal",
        Box::new(|| {
            let _ = std::io::stdout().flush();
        }),
    );

    // ===== Command registry =====
    let commands: Vec<Arc<dyn Command>> = vec![
        Arc::new(EchoCommand),
        Arc::new(SessionInfoCommand),
        Arc::new(LogCommand::new(Arc::clone(&scheduler))),
        Arc::new(SubscribeCommand::new(Arc::clone(&cleanups))),
    ];
    let registry = Arc::new(CommandSet::with_commands(Arc::new(output.clone()), commands));

    // ===== Interactive session =====
    let history = HistoryStore::for_storage_directory(config.storage_directory());
    tracing::debug!(path = %history.path().display(), "Using history file");

    let command_names = registry.names().into_iter().map(str::to_string).collect();
    let mut source = EditorLineSource::new(config.prompt.clone(), command_names)?;

    let cleanup = handle.shutdown_task(cleanups);

    println!("{}", "=== fabsh interactive mode ===".bright_magenta().bold());
    println!(
        "{}",
        format!("Type 'help' for commands or '{}' to exit.", STOP_COMMAND).bright_black()
    );

    let grace = Duration::from_millis(config.shutdown_grace_ms);
    let mut session = InteractiveSession::new(
        config,
        history,
        output,
        registry,
        Arc::clone(&scheduler),
        cleanup,
    );
    let reason = session.run(&mut source);
    tracing::debug!(?reason, "Interactive session ended");

    // After quit() the cleanup task stops the processor itself.
    if reason == StopReason::EndOfInput
        && let Err(e) = handle.stop()
    {
        tracing::debug!(error = %e, "Event processor already stopped");
    }
    processor.wait_for_exit(grace);

    Ok(())
}
