//! Tick scheduler: start/distribute/tick state machine
//!
//! ```text
//! Unconfigured ──start──► Started ──run──► Running
//!      ▲                    │  ▲              │
//!      └───────stop─────────┘  └─interrupt────┘
//! ```
//!
//! The first `run` or `updateall` after a start pushes every live worker its
//! slice of the mapping table. Every iteration then publishes the global
//! signals, ticks all live workers, sleeps the target interval and advances
//! the clock.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use tickproto::{GLOBALS_SOURCE, RuntimeDir};

use crate::clock::{ClockState, global_signals};
use crate::error::CoordError;
use crate::link::{LinkError, WorkerLink};
use crate::supervisor::{StartReport, Supervisor};
use crate::topology::{Roster, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Unconfigured,
    Started,
    Running,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Unconfigured => write!(f, "unconfigured"),
            SchedulerState::Started => write!(f, "started"),
            SchedulerState::Running => write!(f, "running"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub iterations: u64,
    pub ticks_sent: u64,
    pub tick_failures: u64,
    pub distributions: u64,
    pub commands_forwarded: u64,
}

/// Outcome of pushing the mapping table to the workers
#[derive(Debug, Default)]
pub struct DistributionReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, LinkError)>,
    /// Mapping consumers with no live worker
    pub orphaned: Vec<String>,
}

pub struct TickScheduler {
    state: SchedulerState,
    clock: ClockState,
    mappings_sent: bool,
    supervisor: Supervisor,
    link: Box<dyn WorkerLink>,
    runtime: RuntimeDir,
    stats: SchedulerStats,
}

impl TickScheduler {
    pub fn new(supervisor: Supervisor, link: Box<dyn WorkerLink>, target_interval: f64) -> Self {
        let runtime = supervisor.runtime().clone();
        Self {
            state: SchedulerState::Unconfigured,
            clock: ClockState::new(target_interval),
            mappings_sent: false,
            supervisor,
            link,
            runtime,
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn clock(&self) -> &ClockState {
        &self.clock
    }

    pub fn mappings_sent(&self) -> bool {
        self.mappings_sent
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn set_target_interval(&mut self, interval: f64) {
        debug!(interval, "TickScheduler::set_target_interval: called");
        self.clock.set_target_interval(interval);
    }

    /// The roster or mapping table changed; redistribute before the next tick
    pub fn invalidate_mappings(&mut self) {
        if self.mappings_sent {
            debug!("TickScheduler::invalidate_mappings: mappings will be resent");
        }
        self.mappings_sent = false;
    }

    /// (Re)start every roster worker
    pub fn start(&mut self, roster: &Roster) -> StartReport {
        self.link.reset();
        let report = self.supervisor.start(roster);
        self.state = SchedulerState::Started;
        self.mappings_sent = false;
        info!(
            started = report.started.len(),
            failed = report.failed.len(),
            "Workers started"
        );
        report
    }

    /// Terminate every worker and return to `Unconfigured`
    pub fn stop(&mut self) {
        self.supervisor.kill_children();
        self.link.reset();
        self.state = SchedulerState::Unconfigured;
        self.mappings_sent = false;
    }

    /// Stop ticking `name`; its process keeps running until the next start or stop
    pub fn detach(&mut self, name: &str) -> Option<u32> {
        let pid = self.supervisor.detach(name);
        self.invalidate_mappings();
        pid
    }

    /// Where a mapping source identifier lives on disk
    pub fn resolve_source(&self, topology: &Topology, source: &str) -> PathBuf {
        if source == GLOBALS_SOURCE {
            self.runtime.globals_path()
        } else if topology.roster.contains(source) {
            self.runtime.output_path(source)
        } else {
            PathBuf::from(source)
        }
    }

    /// Push each live worker its output file and input mappings
    pub async fn distribute(&mut self, topology: &Topology) -> DistributionReport {
        let live = self.supervisor.live();
        debug!(workers = live.len(), "TickScheduler::distribute: called");
        let mut report = DistributionReport::default();

        for consumer in topology.mappings.consumers() {
            if !live.iter().any(|(name, _)| name == consumer) {
                warn!(consumer, "Mappings target a worker that is not running");
                report.orphaned.push(consumer.to_string());
            }
        }

        for (name, pid) in &live {
            let mut lines = vec![
                "clearinputmappings".to_string(),
                format!("setoutputfile {}", self.runtime.output_path(name).display()),
            ];
            for entry in topology.mappings.for_consumer(name) {
                lines.push(format!(
                    "addinputmapping {} {} {}",
                    self.resolve_source(topology, &entry.source).display(),
                    entry.output,
                    entry.input
                ));
            }
            match self.link.send_commands(*pid, &lines, &mut self.supervisor).await {
                Ok(seq) => {
                    debug!(name = %name, pid, seq, "Mappings delivered");
                    self.stats.commands_forwarded += 1;
                    report.delivered.push(name.clone());
                }
                Err(e) => {
                    warn!(name = %name, pid, error = %e, "Failed to deliver mappings");
                    report.failed.push((name.clone(), e));
                }
            }
        }

        self.mappings_sent = true;
        self.stats.distributions += 1;
        report
    }

    async fn ensure_distributed(&mut self, topology: &Topology) {
        if !self.mappings_sent {
            self.distribute(topology).await;
        }
    }

    fn require_started(&self) -> Result<(), CoordError> {
        match self.state {
            SchedulerState::Unconfigured => Err(CoordError::NotStarted),
            SchedulerState::Started | SchedulerState::Running => Ok(()),
        }
    }

    /// Publish the global signals for the current time index, then tick every live worker
    async fn publish_and_tick(&mut self) -> Result<(), CoordError> {
        let t = self.clock.time_index();
        global_signals(t).write(&self.runtime.globals_path())?;

        for (name, pid) in self.supervisor.live() {
            match self.link.tick(pid, &mut self.supervisor).await {
                Ok(()) => self.stats.ticks_sent += 1,
                Err(e) => {
                    warn!(name = %name, pid, error = %e, "Tick not delivered");
                    self.stats.tick_failures += 1;
                }
            }
        }
        Ok(())
    }

    fn finish_iteration(&mut self) {
        self.clock.advance();
        self.stats.iterations += 1;
    }

    /// One iteration of the run loop
    pub async fn update_all(&mut self, topology: &Topology) -> Result<(), CoordError> {
        self.require_started()?;
        self.ensure_distributed(topology).await;
        self.publish_and_tick().await?;
        tokio::time::sleep(self.clock.interval()).await;
        self.finish_iteration();
        Ok(())
    }

    /// Tick until `shutdown` resolves
    pub async fn run<F>(&mut self, topology: &Topology, shutdown: F) -> Result<(), CoordError>
    where
        F: Future<Output = ()>,
    {
        self.require_started()?;
        self.ensure_distributed(topology).await;
        self.state = SchedulerState::Running;
        info!(interval = self.clock.target_interval(), "Run loop started");

        tokio::pin!(shutdown);
        let result = loop {
            if let Err(e) = self.publish_and_tick().await {
                break Err(e);
            }
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                _ = tokio::time::sleep(self.clock.interval()) => self.finish_iteration(),
            }
        };

        self.state = SchedulerState::Started;
        info!(
            iterations = self.stats.iterations,
            time_index = self.clock.time_index(),
            "Run loop ended"
        );
        result
    }

    /// Send one bare tick to `name`
    pub async fn tick_worker(&mut self, name: &str) -> Result<(), CoordError> {
        let pid = self.live_pid(name)?;
        self.link.tick(pid, &mut self.supervisor).await?;
        self.stats.ticks_sent += 1;
        Ok(())
    }

    /// Forward one command line to `name` and wait for its acknowledgement
    pub async fn forward(&mut self, name: &str, command: &str) -> Result<u64, CoordError> {
        let pid = self.live_pid(name)?;
        let seq = self
            .link
            .send_commands(pid, &[command.to_string()], &mut self.supervisor)
            .await?;
        self.stats.commands_forwarded += 1;
        Ok(seq)
    }

    fn live_pid(&mut self, name: &str) -> Result<u32, CoordError> {
        self.supervisor
            .live()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, pid)| pid)
            .ok_or_else(|| CoordError::NotRunning(name.to_string()))
    }
}
