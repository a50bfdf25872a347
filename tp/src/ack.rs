//! Acknowledgement files
//!
//! A worker writes `0` once it can receive notifications, then the sequence
//! number of every command envelope it has finished executing.

use std::fs;
use std::path::Path;

use crate::{ProtoError, write_atomic};

/// Sequence number a worker reports when it is ready but has consumed nothing
pub const READY_SEQ: u64 = 0;

pub fn write_ack(path: &Path, seq: u64) -> Result<(), ProtoError> {
    write_atomic(path, &format!("{}\n", seq))
}

/// Highest consumed sequence number, or `None` while the worker has not reported
pub fn read_ack(path: &Path) -> Result<Option<u64>, ProtoError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ProtoError::io(path, e)),
    };
    content
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ProtoError::MalformedAck {
            path: path.to_path_buf(),
            content,
        })
}
