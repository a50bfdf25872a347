//! The coordinator: topology, its file and the scheduler that runs it

use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::{debug, info, warn};

use tickproto::RuntimeDir;

use crate::config::Config;
use crate::error::CoordError;
use crate::interrupt::Interrupt;
use crate::link::{SignalLink, WorkerLink};
use crate::scheduler::TickScheduler;
use crate::supervisor::Supervisor;
use crate::topology::Topology;

pub struct Coordinator {
    pub(crate) topology: Topology,
    pub(crate) config_path: PathBuf,
    pub(crate) scheduler: TickScheduler,
    pub(crate) quit: bool,
    interrupt: Option<Interrupt>,
}

impl Coordinator {
    pub fn new(config_path: PathBuf, topology: Topology, scheduler: TickScheduler) -> Self {
        Self {
            topology,
            config_path,
            scheduler,
            quit: false,
            interrupt: None,
        }
    }

    /// Load the topology at `config_path` and wire up signal-driven workers in `runtime`
    pub fn open(config_path: PathBuf, config: &Config, runtime: RuntimeDir) -> Self {
        let link = SignalLink::new(runtime.clone(), config.ack_timeout(), config.ack_poll());
        Self::with_link(config_path, config, runtime, Box::new(link))
    }

    pub fn with_link(config_path: PathBuf, config: &Config, runtime: RuntimeDir, link: Box<dyn WorkerLink>) -> Self {
        let topology = load_topology(&config_path);
        let supervisor = Supervisor::new(runtime, config.shutdown_grace());
        let scheduler = TickScheduler::new(supervisor, link, topology.target_interval);
        Self::new(config_path, topology, scheduler)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// True once the run loop was interrupted; the session should end
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// The session's interrupt listener, installed on first use
    ///
    /// Every caller gets a clone of the same listener, so a signal seen while
    /// `run` is ticking also ends the session.
    pub fn interrupt(&mut self) -> Result<Interrupt, CoordError> {
        if let Some(interrupt) = &self.interrupt {
            return Ok(interrupt.clone());
        }
        let interrupt = Interrupt::install()?;
        self.interrupt = Some(interrupt.clone());
        Ok(interrupt)
    }

    /// Terminate every worker
    pub fn shutdown(&mut self) {
        debug!("Coordinator::shutdown: called");
        self.scheduler.stop();
    }
}

/// Missing or unreadable topology files start an empty topology
fn load_topology(path: &Path) -> Topology {
    if !path.exists() {
        info!(path = %path.display(), "Topology file does not exist, starting empty");
        eprintln!(
            "{} {} does not exist yet; 'save' will create it",
            "warning:".yellow(),
            path.display()
        );
        return Topology::default();
    }

    let readonly = path.metadata().map(|m| m.permissions().readonly()).unwrap_or(false);
    if readonly {
        warn!(path = %path.display(), "Topology file is read-only");
        eprintln!("{} {} is read-only; 'save' will fail", "warning:".yellow(), path.display());
    }

    match Topology::load(path) {
        Ok((topology, warnings)) => {
            for w in &warnings {
                warn!(path = %path.display(), line = w.line, "{}", w.message);
                eprintln!("{} {}: {}", "warning:".yellow(), path.display(), w);
            }
            topology
        }
        Err(e) => {
            warn!(error = %e, "Failed to load topology");
            eprintln!("{} {}", "error:".red(), e);
            Topology::default()
        }
    }
}
