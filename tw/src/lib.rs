//! TickWorker - a worker process for the tickmesh coordinator
//!
//! A worker holds a [`Computation`] behind a small textual command
//! interpreter ([`WorkerHost`]). In child mode it blocks on a queue of
//! notifications: a tick reads the mapped input files, computes and rewrites
//! the output file; a command runs `<pid>.command` as a batch and acknowledges
//! its sequence number.

pub mod cli;
pub mod computation;
pub mod control;
pub mod error;
pub mod host;
pub mod repl;

pub use computation::{Computation, Negate};
pub use control::{ControlLoop, run_child};
pub use error::HostError;
pub use host::{HostStats, TickReport, WorkerHost};
