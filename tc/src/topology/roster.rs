use std::fmt;

use tickproto::GLOBALS_SOURCE;

use crate::error::CoordError;

/// One configured worker: a unique name and the program that runs it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub name: String,
    pub invocation: String,
    pub argv: Vec<String>,
}

impl WorkerSpec {
    pub fn new(name: impl Into<String>, invocation: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            name: name.into(),
            invocation: invocation.into(),
            argv,
        }
    }

    /// Build from `name invocation [args...]` tokens
    pub fn from_tokens<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<Self> {
        let name = tokens.next()?;
        let invocation = tokens.next()?;
        Some(Self::new(name, invocation, tokens.map(str::to_string).collect()))
    }

    /// `invocation arg0 arg1 ...` as typed on a shell
    pub fn command_line(&self) -> String {
        std::iter::once(self.invocation.as_str())
            .chain(self.argv.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.command_line())
    }
}

/// Reject names that would collide with the runtime directory layout
pub fn validate_name(name: &str) -> Result<(), CoordError> {
    let reason = if name == GLOBALS_SOURCE {
        Some("reserved for the global signal file")
    } else if name.starts_with('#') {
        Some("names may not start with '#'")
    } else if name.contains('/') {
        Some("names may not contain '/'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(CoordError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Worker specs in insertion order, unique by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    workers: Vec<WorkerSpec>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `spec`, replacing an existing spec of the same name in place
    pub fn insert(&mut self, spec: WorkerSpec) -> Option<WorkerSpec> {
        match self.workers.iter_mut().find(|w| w.name == spec.name) {
            Some(existing) => Some(std::mem::replace(existing, spec)),
            None => {
                self.workers.push(spec);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<WorkerSpec> {
        let idx = self.workers.iter().position(|w| w.name == name)?;
        Some(self.workers.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<&WorkerSpec> {
        self.workers.iter().find(|w| w.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkerSpec> {
        self.workers.iter()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a WorkerSpec;
    type IntoIter = std::slice::Iter<'a, WorkerSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
