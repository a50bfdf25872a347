//! Error types for the tickmesh protocol

use std::path::PathBuf;

use thiserror::Error;

use crate::Notification;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deliver {kind} notification to pid {pid}: {source}")]
    Signal {
        pid: u32,
        kind: Notification,
        #[source]
        source: nix::Error,
    },

    #[error("Malformed acknowledgement in {path}: {content:?}")]
    MalformedAck { path: PathBuf, content: String },
}

impl ProtoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the underlying cause is a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
