use thiserror::Error;
use tickproto::ProtoError;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("No input named '{0}' exists")]
    NoSuchInput(String),

    #[error("No output named '{0}' exists")]
    NoSuchOutput(String),

    #[error("Port '{0}' already exists")]
    DuplicatePort(String),

    #[error("No mapping for '{output}' from {file}")]
    NoSuchMapping { file: String, output: String },

    #[error(transparent)]
    Proto(#[from] ProtoError),
}
