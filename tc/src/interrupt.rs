//! Interrupt handling for the coordinator session
//!
//! SIGINT and SIGTERM are caught once for the whole session. Every clone of an
//! [`Interrupt`] observes the same trip, so the session and the run loop share
//! one listener.

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::CoordError;

#[derive(Debug, Clone)]
pub struct Interrupt {
    tripped: watch::Receiver<bool>,
}

impl Interrupt {
    /// Replace the default SIGINT/SIGTERM action with a shared trip flag
    ///
    /// Must be called from within a tokio runtime.
    pub fn install() -> Result<Self, CoordError> {
        let mut sigint = signal(SignalKind::interrupt()).map_err(CoordError::Signals)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(CoordError::Signals)?;
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
            // tokio keeps the handlers registered, so later signals are swallowed
            let _ = tx.send(true);
        });

        debug!("Interrupt::install: handlers installed");
        Ok(Self { tripped: rx })
    }

    pub fn is_tripped(&self) -> bool {
        *self.tripped.borrow()
    }

    /// Resolve once SIGINT or SIGTERM has been received
    pub async fn recv(&mut self) {
        let seen = self.tripped.wait_for(|tripped| *tripped).await.is_ok();
        if seen || self.is_tripped() {
            return;
        }
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    #[tokio::test]
    async fn test_sigterm_trips_every_clone() {
        let mut first = Interrupt::install().unwrap();
        let mut second = first.clone();
        assert!(!first.is_tripped());

        kill(Pid::this(), Signal::SIGTERM).unwrap();

        tokio::time::timeout(Duration::from_secs(5), first.recv()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), second.recv()).await.unwrap();
        assert!(second.is_tripped());
    }
}
