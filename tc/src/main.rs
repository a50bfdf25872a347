//! tc - tickmesh coordinator
//!
//! Loads a topology, optionally runs a command file, then hands the terminal
//! to the interactive command loop. Workers are terminated and the runtime
//! directory removed on every exit path, SIGINT and SIGTERM included.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use tickcoord::cli::Cli;
use tickcoord::{Config, Coordinator, repl};
use tickproto::RuntimeDir;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tickmesh")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > settings file > INFO
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

    let log_file = fs::File::create(log_dir.join("tc.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.settings.as_ref()).context("Failed to load settings")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let runtime = RuntimeDir::new(
        cli.runtime_dir
            .clone()
            .or_else(|| config.runtime_dir.clone())
            .unwrap_or_else(RuntimeDir::default_root),
    );
    runtime
        .create()
        .context(format!("Failed to create runtime directory {}", runtime.root().display()))?;
    info!(runtime = %runtime.root().display(), topology = %cli.config.display(), "tc starting");

    let mut coordinator = Coordinator::open(cli.config.clone(), &config, runtime.clone());
    let mut interrupt = coordinator.interrupt()?;
    let result = tokio::select! {
        result = drive(&cli, &config, &mut coordinator) => result,
        _ = interrupt.recv() => {
            warn!("Interrupted, shutting down");
            eprintln!("interrupted");
            Ok(())
        }
    };

    coordinator.shutdown();
    if cli.keep_runtime {
        info!(runtime = %runtime.root().display(), "Keeping runtime directory");
    } else if let Err(e) = runtime.remove() {
        warn!(error = %e, "Failed to remove runtime directory");
    }
    debug!(ok = result.is_ok(), "main: exiting");
    result
}

async fn drive(cli: &Cli, config: &Config, coordinator: &mut Coordinator) -> Result<()> {
    if let Some(path) = &cli.commands {
        let report = coordinator
            .run_command_file(path)
            .await
            .context(format!("Failed to run command file {}", path.display()))?;
        if !report.is_success() {
            eyre::bail!(
                "{} of {} commands in {} failed",
                report.failures.len(),
                report.executed,
                path.display()
            );
        }
    }

    if !cli.child && !coordinator.quit_requested() {
        repl::run_interactive(coordinator, config.history_file.as_deref()).await?;
    }
    Ok(())
}
