//! TickCoord - lock-step coordinator for tickmesh workers
//!
//! The coordinator owns a [`Topology`] (worker roster, mapping table, tick
//! interval), spawns one process per roster entry, pushes each worker its
//! slice of the mapping table and then drives every worker one tick at a time:
//!
//! ```text
//! command line ──► Router ──► Topology / TickScheduler
//!                                          │
//!                       Supervisor ◄───────┤ start / stop
//!                       WorkerLink ◄───────┘ distribute, tick, forward
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod interrupt;
pub mod link;
pub mod repl;
pub mod router;
pub mod scheduler;
pub mod supervisor;
pub mod topology;

pub use clock::{ClockState, DEFAULT_TARGET_INTERVAL, global_signals};
pub use config::Config;
pub use coordinator::Coordinator;
pub use error::CoordError;
pub use link::{LinkError, SignalLink, WorkerLink};
pub use scheduler::{DistributionReport, SchedulerState, SchedulerStats, TickScheduler};
pub use supervisor::{ProcessHandle, StartReport, Supervisor};
pub use topology::{ConfigWarning, MappingEntry, MappingTable, Roster, Topology, WorkerSpec};
