//! Command envelopes: the contents of a `<pid>.command` file
//!
//! An envelope is a `# seq <n>` header followed by command lines. The header
//! is a comment, so an envelope is also a plain command batch.

use std::fs;
use std::path::Path;

use crate::{ProtoError, write_atomic};

const SEQ_HEADER: &str = "# seq ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub seq: Option<u64>,
    pub body: String,
}

impl Envelope {
    pub fn new<S: AsRef<str>>(seq: u64, lines: &[S]) -> Self {
        let mut body = String::new();
        for line in lines {
            body.push_str(line.as_ref());
            body.push('\n');
        }
        Self { seq: Some(seq), body }
    }

    pub fn encode(&self) -> String {
        match self.seq {
            Some(seq) => format!("{}{}\n{}", SEQ_HEADER, seq, self.body),
            None => self.body.clone(),
        }
    }

    /// Parse file contents; text without a header is an unsequenced envelope
    pub fn decode(text: &str) -> Self {
        let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
        let seq = first
            .trim()
            .strip_prefix(SEQ_HEADER.trim_end())
            .and_then(|n| n.trim().parse::<u64>().ok());
        match seq {
            Some(seq) => Self {
                seq: Some(seq),
                body: rest.to_string(),
            },
            None => Self {
                seq: None,
                body: text.to_string(),
            },
        }
    }

    pub fn read(path: &Path) -> Result<Self, ProtoError> {
        let text = fs::read_to_string(path).map_err(|e| ProtoError::io(path, e))?;
        Ok(Self::decode(&text))
    }

    pub fn write(&self, path: &Path) -> Result<(), ProtoError> {
        write_atomic(path, &self.encode())
    }
}
