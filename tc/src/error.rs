use std::path::PathBuf;

use thiserror::Error;
use tickproto::ProtoError;

use crate::link::LinkError;

#[derive(Debug, Error)]
pub enum CoordError {
    #[error("Unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Workers have not been started; run 'start' first")]
    NotStarted,

    #[error("No worker named '{0}'")]
    NoSuchWorker(String),

    #[error("Worker '{0}' has no running process")]
    NotRunning(String),

    #[error("Invalid worker name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("No mapping {source_file} {output} -> {consumer}")]
    NoSuchMapping {
        source_file: String,
        output: String,
        consumer: String,
    },

    #[error("Invalid interval '{0}': expected a non-negative number of seconds")]
    InvalidInterval(String),

    #[error("Failed to spawn worker '{name}' ({invocation}): {source}")]
    Spawn {
        name: String,
        invocation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install interrupt handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Proto(#[from] ProtoError),
}
