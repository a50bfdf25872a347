//! TickProto - the protocol spoken between a tickmesh coordinator and its workers
//!
//! Both sides share nothing but a runtime directory and two signals:
//!
//! ```text
//! $XDG_RUNTIME_DIR/tickmesh/
//! ├── globals.output     # global signals, rewritten every tick
//! ├── <name>.output      # latest output snapshot of worker <name>
//! ├── <pid>.command      # command envelope for worker <pid>
//! └── <pid>.ack          # highest envelope seq consumed by <pid>
//! ```
//!
//! SIGUSR1 asks a worker to tick, SIGUSR2 asks it to run its command file.
//! Every file is written to a temporary sibling and renamed into place.

pub mod ack;
mod atomic;
pub mod command;
pub mod envelope;
pub mod error;
pub mod notify;
pub mod runtime;
pub mod values;

pub use atomic::write_atomic;
pub use command::{BatchReport, CommandLine, LineFailure, executable_lines};
pub use envelope::Envelope;
pub use error::ProtoError;
pub use notify::Notification;
pub use runtime::RuntimeDir;
pub use values::NamedValues;

/// Source identifier that resolves to the global signal file
pub const GLOBALS_SOURCE: &str = "globals";

/// Environment variable the coordinator uses to hand its runtime directory to workers
pub const RUNTIME_DIR_ENV: &str = "TICKMESH_RUNTIME_DIR";
