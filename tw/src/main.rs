//! tw - generic tickmesh worker
//!
//! Negates its inputs on every tick. Run with `--child` under a coordinator,
//! or without it for an interactive session.

use std::fs;

use clap::Parser;
use eyre::{Context, Result};
use log::{debug, info};

use tickproto::RuntimeDir;
use tickworker::cli::Cli;
use tickworker::{Negate, WorkerHost, repl, run_child};

fn setup_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(s) => s.parse::<log::LevelFilter>().context(format!("Unknown log-level '{}'", s))?,
        None => log::LevelFilter::Warn,
    };
    env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .init();
    Ok(())
}

/// Ask the kernel to terminate this worker when the coordinator goes away
#[cfg(target_os = "linux")]
fn exit_with_parent() {
    if let Err(e) = nix::sys::prctl::set_pdeathsig(nix::sys::signal::Signal::SIGTERM) {
        log::warn!("Failed to set parent-death signal: {}", e);
    }
}

#[cfg(not(target_os = "linux"))]
fn exit_with_parent() {}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;
    debug!(
        "main: child={} inputs={:?} outputs={:?}",
        cli.child, cli.inputs, cli.outputs
    );

    let mut host = WorkerHost::new(Box::new(Negate), cli.inputs, cli.outputs);

    if let Some(path) = &cli.commands {
        let text = fs::read_to_string(path).context(format!("Failed to read command file {}", path.display()))?;
        let report = host.run_commands(&text);
        if !report.is_success() {
            eyre::bail!(
                "{} of {} commands in {} failed",
                report.failures.len(),
                report.executed,
                path.display()
            );
        }
    }

    if cli.child {
        exit_with_parent();
        let runtime = RuntimeDir::new(cli.runtime_dir.unwrap_or_else(RuntimeDir::default_root));
        info!("tw {} starting in child mode", std::process::id());
        run_child(host, runtime).await
    } else {
        repl::run_interactive(&mut host)
    }
}
