//! The two payload-less notifications a worker reacts to

use std::fmt;

use log::debug;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::ProtoError;

/// Notification kinds, carried by POSIX user signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    /// Run one computation tick (SIGUSR1)
    Tick,
    /// Execute the command file (SIGUSR2)
    Command,
}

impl Notification {
    pub const ALL: [Notification; 2] = [Notification::Tick, Notification::Command];

    /// Signal that carries this notification
    pub fn signal(self) -> Signal {
        match self {
            Notification::Tick => Signal::SIGUSR1,
            Notification::Command => Signal::SIGUSR2,
        }
    }

    pub fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::SIGUSR1 => Some(Notification::Tick),
            Signal::SIGUSR2 => Some(Notification::Command),
            _ => None,
        }
    }

    /// Deliver this notification to `pid`
    pub fn send(self, pid: u32) -> Result<(), ProtoError> {
        debug!("Notification::send: {} -> pid {}", self, pid);
        signal::kill(Pid::from_raw(pid as i32), self.signal()).map_err(|source| ProtoError::Signal {
            pid,
            kind: self,
            source,
        })
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Tick => write!(f, "tick"),
            Notification::Command => write!(f, "command"),
        }
    }
}

/// Check whether a process with `pid` exists (signal 0)
///
/// An exited child that nobody has reaped yet still exists; ask the
/// process owner when that matters.
pub fn is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}
