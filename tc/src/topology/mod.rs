//! Worker topology: the roster, the mapping table and the tick interval
//!
//! Persisted as a sectioned text file (see [`store`]).

mod mapping;
mod roster;
pub mod store;

use std::path::Path;

use tracing::{debug, info};

pub use mapping::{MappingEntry, MappingTable};
pub use roster::{Roster, WorkerSpec, validate_name};
pub use store::ConfigWarning;

use crate::clock::DEFAULT_TARGET_INTERVAL;
use crate::error::CoordError;

#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub roster: Roster,
    pub mappings: MappingTable,
    /// Seconds between ticks
    pub target_interval: f64,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            roster: Roster::new(),
            mappings: MappingTable::new(),
            target_interval: DEFAULT_TARGET_INTERVAL,
        }
    }
}

impl Topology {
    /// Load a topology file, returning the lines that had to be skipped
    pub fn load(path: &Path) -> Result<(Self, Vec<ConfigWarning>), CoordError> {
        debug!(path = %path.display(), "Topology::load: called");
        let text = std::fs::read_to_string(path).map_err(|source| CoordError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let (topology, warnings) = store::parse(&text);
        info!(
            path = %path.display(),
            workers = topology.roster.len(),
            mappings = topology.mappings.len(),
            warnings = warnings.len(),
            "Loaded topology"
        );
        Ok((topology, warnings))
    }

    /// Atomically write the topology to `path`
    pub fn save(&self, path: &Path) -> Result<(), CoordError> {
        debug!(path = %path.display(), "Topology::save: called");
        tickproto::write_atomic(path, &store::render(self))?;
        info!(path = %path.display(), "Saved topology");
        Ok(())
    }
}
