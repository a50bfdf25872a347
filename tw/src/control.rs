//! Child-mode control loop
//!
//! One listener task per notification kind turns delivered signals into
//! queue entries. The loop drains the queue in arrival order, so a
//! notification that lands while another is being handled waits its turn
//! instead of interrupting it.

use log::{debug, error, info, warn};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;

use tickproto::ack::{READY_SEQ, write_ack};
use tickproto::{Envelope, Notification, RuntimeDir};

use crate::error::HostError;
use crate::host::WorkerHost;

/// Notifications that may wait while one is being handled
pub const QUEUE_DEPTH: usize = 64;

pub struct ControlLoop {
    host: WorkerHost,
    runtime: RuntimeDir,
    pid: u32,
    /// Highest envelope seq executed so far
    last_seq: u64,
}

impl ControlLoop {
    pub fn new(host: WorkerHost, runtime: RuntimeDir, pid: u32) -> Self {
        Self {
            host,
            runtime,
            pid,
            last_seq: READY_SEQ,
        }
    }

    pub fn host(&self) -> &WorkerHost {
        &self.host
    }

    /// Tell the coordinator this worker can receive notifications
    pub fn announce_ready(&self) -> Result<(), HostError> {
        write_ack(&self.runtime.ack_path(self.pid), READY_SEQ)?;
        info!("Worker {} ready in {}", self.pid, self.runtime.root().display());
        Ok(())
    }

    /// Handle queued notifications until every sender is gone
    pub async fn run(&mut self, mut rx: mpsc::Receiver<Notification>) {
        while let Some(notification) = rx.recv().await {
            self.handle(notification);
        }
        debug!("ControlLoop::run: notification queue closed");
    }

    pub fn handle(&mut self, notification: Notification) {
        debug!("ControlLoop::handle: {}", notification);
        let result = match notification {
            Notification::Tick => self.host.tick().map(|_| ()),
            Notification::Command => self.handle_command(),
        };
        if let Err(e) = result {
            error!("Worker {} failed to handle {}: {}", self.pid, notification, e);
        }
    }

    /// Run the command envelope; a sequenced envelope runs at most once
    fn handle_command(&mut self) -> Result<(), HostError> {
        let envelope = Envelope::read(&self.runtime.command_path(self.pid))?;
        if let Some(seq) = envelope.seq {
            if seq <= self.last_seq {
                debug!("Worker {}: envelope {} already executed, re-acknowledging", self.pid, seq);
                write_ack(&self.runtime.ack_path(self.pid), self.last_seq)?;
                return Ok(());
            }
        }

        let report = self.host.run_commands(&envelope.body);
        if !report.is_success() {
            warn!(
                "Worker {}: {} of {} commands failed",
                self.pid,
                report.failures.len(),
                report.executed
            );
        }
        if let Some(seq) = envelope.seq {
            self.last_seq = seq;
            write_ack(&self.runtime.ack_path(self.pid), seq)?;
        }
        Ok(())
    }
}

fn spawn_listener(kind: Notification, tx: mpsc::Sender<Notification>) -> std::io::Result<()> {
    let mut stream = signal(SignalKind::from_raw(kind.signal() as i32))?;
    tokio::spawn(async move {
        while stream.recv().await.is_some() {
            if tx.send(kind).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

/// Install the listeners, announce readiness and run the control loop forever
pub async fn run_child(host: WorkerHost, runtime: RuntimeDir) -> eyre::Result<()> {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    for kind in Notification::ALL {
        spawn_listener(kind, tx.clone())?;
    }
    drop(tx);

    let mut control = ControlLoop::new(host, runtime, std::process::id());
    control.announce_ready()?;
    control.run(rx).await;
    Ok(())
}
