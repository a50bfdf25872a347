//! Coordinator side of the rendezvous protocol
//!
//! [`SignalLink`] never signals a worker before the worker has reported ready,
//! and never writes a new command envelope for a worker before the previous one
//! was acknowledged. While waiting it asks a [`Liveness`] source every poll, so
//! a worker that died gives up the wait at once.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use tickproto::ack::{READY_SEQ, read_ack};
use tickproto::{Envelope, Notification, ProtoError, RuntimeDir};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Worker {pid} did not report ready within {waited:?}")]
    NotReady { pid: u32, waited: Duration },

    #[error("Worker {pid} did not acknowledge command {seq} within {waited:?}")]
    AckTimeout { pid: u32, seq: u64, waited: Duration },

    #[error("Worker {pid} is not running")]
    Gone { pid: u32 },

    #[error(transparent)]
    Proto(#[from] ProtoError),
}

/// Whether a worker process is still running
///
/// Implemented by the owner of the process handles, which can tell an exited
/// but unreaped child from a running one.
pub trait Liveness: Send {
    fn is_running(&mut self, pid: u32) -> bool;
}

/// How the coordinator reaches a worker process
#[async_trait]
pub trait WorkerLink: Send {
    /// Wait until `pid` can receive notifications
    async fn wait_ready(&mut self, pid: u32, liveness: &mut dyn Liveness) -> Result<(), LinkError>;

    /// Deliver a bare tick
    async fn tick(&mut self, pid: u32, liveness: &mut dyn Liveness) -> Result<(), LinkError>;

    /// Forward command lines; resolves with the envelope seq once the worker acknowledged it
    async fn send_commands(
        &mut self,
        pid: u32,
        lines: &[String],
        liveness: &mut dyn Liveness,
    ) -> Result<u64, LinkError>;

    /// Forget per-process state, called whenever workers are stopped or restarted
    fn reset(&mut self) {}
}

/// POSIX-signal link with file acknowledgements
pub struct SignalLink {
    runtime: RuntimeDir,
    ack_timeout: Duration,
    poll: Duration,
    next_seq: u64,
    ready: HashSet<u32>,
}

impl SignalLink {
    pub fn new(runtime: RuntimeDir, ack_timeout: Duration, poll: Duration) -> Self {
        Self {
            runtime,
            ack_timeout,
            poll,
            next_seq: READY_SEQ + 1,
            ready: HashSet::new(),
        }
    }

    async fn wait_for_ack(&self, pid: u32, at_least: u64, liveness: &mut dyn Liveness) -> Result<(), LinkError> {
        let path = self.runtime.ack_path(pid);
        let started = Instant::now();
        loop {
            match read_ack(&path)? {
                Some(seq) if seq >= at_least => {
                    debug!(pid, seq, waited = ?started.elapsed(), "SignalLink::wait_for_ack: acknowledged");
                    return Ok(());
                }
                _ => {}
            }
            if !liveness.is_running(pid) {
                return Err(LinkError::Gone { pid });
            }
            let waited = started.elapsed();
            if waited >= self.ack_timeout {
                return Err(if at_least == READY_SEQ {
                    LinkError::NotReady { pid, waited }
                } else {
                    LinkError::AckTimeout {
                        pid,
                        seq: at_least,
                        waited,
                    }
                });
            }
            sleep(self.poll).await;
        }
    }
}

#[async_trait]
impl WorkerLink for SignalLink {
    async fn wait_ready(&mut self, pid: u32, liveness: &mut dyn Liveness) -> Result<(), LinkError> {
        if self.ready.contains(&pid) {
            return Ok(());
        }
        self.wait_for_ack(pid, READY_SEQ, liveness).await?;
        self.ready.insert(pid);
        Ok(())
    }

    async fn tick(&mut self, pid: u32, liveness: &mut dyn Liveness) -> Result<(), LinkError> {
        self.wait_ready(pid, liveness).await?;
        Notification::Tick.send(pid)?;
        Ok(())
    }

    async fn send_commands(
        &mut self,
        pid: u32,
        lines: &[String],
        liveness: &mut dyn Liveness,
    ) -> Result<u64, LinkError> {
        self.wait_ready(pid, liveness).await?;
        let seq = self.next_seq;
        self.next_seq += 1;

        debug!(pid, seq, lines = lines.len(), "SignalLink::send_commands: called");
        Envelope::new(seq, lines).write(&self.runtime.command_path(pid))?;
        Notification::Command.send(pid)?;

        if let Err(e) = self.wait_for_ack(pid, seq, liveness).await {
            warn!(pid, seq, error = %e, "Command envelope was not acknowledged");
            return Err(e);
        }
        Ok(seq)
    }

    fn reset(&mut self) {
        self.ready.clear();
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-process link that records what would have been sent

    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum LinkEvent {
        Tick(u32),
        Commands(u32, Vec<String>),
    }

    #[derive(Debug, Clone, Default)]
    pub struct RecordingLink {
        events: Arc<Mutex<Vec<LinkEvent>>>,
        seq: u64,
    }

    impl RecordingLink {
        pub fn events(&self) -> Vec<LinkEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn commands_for(&self, pid: u32) -> Vec<Vec<String>> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    LinkEvent::Commands(p, lines) if p == pid => Some(lines),
                    _ => None,
                })
                .collect()
        }

        pub fn ticks_for(&self, pid: u32) -> usize {
            self.events()
                .iter()
                .filter(|e| **e == LinkEvent::Tick(pid))
                .count()
        }
    }

    #[async_trait]
    impl WorkerLink for RecordingLink {
        async fn wait_ready(&mut self, _pid: u32, _liveness: &mut dyn Liveness) -> Result<(), LinkError> {
            Ok(())
        }

        async fn tick(&mut self, pid: u32, _liveness: &mut dyn Liveness) -> Result<(), LinkError> {
            self.events.lock().unwrap().push(LinkEvent::Tick(pid));
            Ok(())
        }

        async fn send_commands(
            &mut self,
            pid: u32,
            lines: &[String],
            _liveness: &mut dyn Liveness,
        ) -> Result<u64, LinkError> {
            self.seq += 1;
            self.events
                .lock()
                .unwrap()
                .push(LinkEvent::Commands(pid, lines.to_vec()));
            Ok(self.seq)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tickproto::ack::write_ack;

    use crate::supervisor::Supervisor;
    use crate::topology::{Roster, WorkerSpec};

    /// Liveness answer fixed by the test
    struct Running(bool);

    impl Liveness for Running {
        fn is_running(&mut self, _pid: u32) -> bool {
            self.0
        }
    }

    fn link(temp: &TempDir) -> SignalLink {
        SignalLink::new(
            RuntimeDir::new(temp.path()),
            Duration::from_millis(50),
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn test_wait_ready_sees_ready_ack() {
        let temp = TempDir::new().unwrap();
        let mut link = link(&temp);
        let pid = std::process::id();
        write_ack(&RuntimeDir::new(temp.path()).ack_path(pid), READY_SEQ).unwrap();

        link.wait_ready(pid, &mut Running(true)).await.unwrap();
        fs_remove(&temp, pid);
        // cached: no file needed the second time
        link.wait_ready(pid, &mut Running(true)).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_ready_times_out_for_silent_live_process() {
        let temp = TempDir::new().unwrap();
        let mut link = link(&temp);

        let err = link.wait_ready(std::process::id(), &mut Running(true)).await.unwrap_err();
        assert!(matches!(err, LinkError::NotReady { .. }));
    }

    #[tokio::test]
    async fn test_wait_ready_reports_dead_process() {
        let temp = TempDir::new().unwrap();
        let mut link = link(&temp);

        let err = link.wait_ready(4_000_002, &mut Running(false)).await.unwrap_err();
        assert!(matches!(err, LinkError::Gone { pid: 4_000_002 }));
    }

    #[tokio::test]
    async fn test_unreaped_worker_is_gone_without_waiting_out_the_timeout() {
        let temp = TempDir::new().unwrap();
        let mut link = SignalLink::new(
            RuntimeDir::new(temp.path()),
            Duration::from_secs(10),
            Duration::from_millis(5),
        );
        let mut supervisor = Supervisor::new(RuntimeDir::new(temp.path()), Duration::from_millis(500));
        let mut roster = Roster::new();
        roster.insert(WorkerSpec::new("quick", "true", vec![]));
        let pid = supervisor.start(&roster).started[0].1;
        std::thread::sleep(Duration::from_millis(200));

        let started = Instant::now();
        let err = link.wait_ready(pid, &mut supervisor).await.unwrap_err();

        assert!(matches!(err, LinkError::Gone { .. }), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_reset_forgets_readiness() {
        let temp = TempDir::new().unwrap();
        let mut link = link(&temp);
        let pid = std::process::id();
        write_ack(&RuntimeDir::new(temp.path()).ack_path(pid), READY_SEQ).unwrap();
        link.wait_ready(pid, &mut Running(true)).await.unwrap();

        link.reset();
        fs_remove(&temp, pid);

        assert!(link.wait_ready(pid, &mut Running(true)).await.is_err());
    }

    fn fs_remove(temp: &TempDir, pid: u32) {
        std::fs::remove_file(RuntimeDir::new(temp.path()).ack_path(pid)).unwrap();
    }
}
