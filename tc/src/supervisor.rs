//! Process supervision for roster workers
//!
//! One OS process per roster entry, spawned in its own process group with the
//! runtime directory in its environment. Termination is SIGTERM, a bounded
//! grace period, then SIGKILL.

use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, error, info, warn};

use tickproto::{RUNTIME_DIR_ENV, RuntimeDir};

use crate::error::CoordError;
use crate::link::Liveness;
use crate::topology::{Roster, WorkerSpec};

const EXIT_POLL: Duration = Duration::from_millis(10);

/// A spawned worker process
#[derive(Debug)]
pub struct ProcessHandle {
    name: String,
    pid: u32,
    started_at: DateTime<Utc>,
    child: Child,
}

impl ProcessHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn try_wait(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                warn!(name = %self.name, pid = self.pid, error = %e, "Failed to poll worker");
                None
            }
        }
    }
}

/// Outcome of [`Supervisor::start`]
#[derive(Debug, Default)]
pub struct StartReport {
    pub started: Vec<(String, u32)>,
    pub failed: Vec<(String, CoordError)>,
}

pub struct Supervisor {
    runtime: RuntimeDir,
    grace: Duration,
    /// Handles that receive ticks and commands, in roster order
    active: Vec<ProcessHandle>,
    /// Handles of removed workers, kept until the next start or shutdown
    detached: Vec<ProcessHandle>,
}

impl Supervisor {
    pub fn new(runtime: RuntimeDir, grace: Duration) -> Self {
        Self {
            runtime,
            grace,
            active: Vec::new(),
            detached: Vec::new(),
        }
    }

    /// Terminate everything, then spawn one process per roster entry
    pub fn start(&mut self, roster: &Roster) -> StartReport {
        debug!(workers = roster.len(), "Supervisor::start: called");
        self.kill_children();

        let mut report = StartReport::default();
        for spec in roster {
            match self.spawn(spec) {
                Ok(handle) => {
                    info!(name = %spec.name, pid = handle.pid, command = %spec.command_line(), "Started worker");
                    report.started.push((spec.name.clone(), handle.pid));
                    self.active.push(handle);
                }
                Err(e) => {
                    error!(name = %spec.name, error = %e, "Failed to start worker");
                    report.failed.push((spec.name.clone(), e));
                }
            }
        }
        report
    }

    fn spawn(&self, spec: &WorkerSpec) -> Result<ProcessHandle, CoordError> {
        let child = Command::new(&spec.invocation)
            .args(&spec.argv)
            .env(RUNTIME_DIR_ENV, self.runtime.root())
            .stdin(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|source| CoordError::Spawn {
                name: spec.name.clone(),
                invocation: spec.command_line(),
                source,
            })?;
        Ok(ProcessHandle {
            name: spec.name.clone(),
            pid: child.id(),
            started_at: Utc::now(),
            child,
        })
    }

    /// Terminate every worker, active or detached
    pub fn kill_children(&mut self) {
        let mut handles: Vec<ProcessHandle> = self.active.drain(..).chain(self.detached.drain(..)).collect();
        if handles.is_empty() {
            return;
        }
        debug!(count = handles.len(), "Supervisor::kill_children: called");

        for handle in &mut handles {
            if handle.try_wait().is_some() {
                continue;
            }
            if let Err(e) = signal::kill(Pid::from_raw(handle.pid as i32), Signal::SIGTERM) {
                warn!(name = %handle.name, pid = handle.pid, error = %e, "Failed to send SIGTERM");
            }
        }

        let deadline = Instant::now() + self.grace;
        loop {
            handles.retain_mut(|h| match h.try_wait() {
                Some(status) => {
                    debug!(name = %h.name, pid = h.pid, %status, "Worker exited");
                    self.runtime.forget_pid(h.pid);
                    false
                }
                None => true,
            });
            if handles.is_empty() || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(EXIT_POLL);
        }

        for mut handle in handles {
            warn!(name = %handle.name, pid = handle.pid, "Worker ignored SIGTERM, sending SIGKILL");
            let _ = handle.child.kill();
            let _ = handle.child.wait();
            self.runtime.forget_pid(handle.pid);
        }
    }

    /// Stop ticking `name` without terminating it; returns its pid
    pub fn detach(&mut self, name: &str) -> Option<u32> {
        let idx = self.active.iter().position(|h| h.name == name)?;
        let handle = self.active.remove(idx);
        let pid = handle.pid;
        info!(name, pid, "Detached worker");
        self.detached.push(handle);
        Some(pid)
    }

    /// Drop handles whose process has exited and return the live ones as `(name, pid)`
    pub fn live(&mut self) -> Vec<(String, u32)> {
        let runtime = &self.runtime;
        self.active.retain_mut(|h| match h.try_wait() {
            Some(status) => {
                warn!(name = %h.name, pid = h.pid, %status, "Worker exited unexpectedly");
                runtime.forget_pid(h.pid);
                false
            }
            None => true,
        });
        self.active.iter().map(|h| (h.name.clone(), h.pid)).collect()
    }

    pub fn pid_of(&self, name: &str) -> Option<u32> {
        self.active.iter().find(|h| h.name == name).map(|h| h.pid)
    }

    pub fn handle(&self, name: &str) -> Option<&ProcessHandle> {
        self.active.iter().find(|h| h.name == name)
    }

    pub fn active(&self) -> &[ProcessHandle] {
        &self.active
    }

    pub fn detached(&self) -> &[ProcessHandle] {
        &self.detached
    }

    pub fn runtime(&self) -> &RuntimeDir {
        &self.runtime
    }
}

impl Liveness for Supervisor {
    /// Polls the child handle, so an exited but unreaped worker is not running
    fn is_running(&mut self, pid: u32) -> bool {
        match self.active.iter_mut().chain(self.detached.iter_mut()).find(|h| h.pid == pid) {
            Some(handle) => handle.try_wait().is_none(),
            None => false,
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.kill_children();
    }
}
