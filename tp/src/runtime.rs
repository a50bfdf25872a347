//! Layout of the shared runtime directory

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::ProtoError;

const OUTPUT_EXT: &str = "output";
const COMMAND_EXT: &str = "command";
const ACK_EXT: &str = "ack";
const GLOBALS_FILE: &str = "globals.output";

/// Runtime directory shared by a coordinator and its workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDir {
    root: PathBuf,
}

impl RuntimeDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$XDG_RUNTIME_DIR/tickmesh`, falling back to the temp directory
    pub fn default_root() -> PathBuf {
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tickmesh")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn command_path(&self, pid: u32) -> PathBuf {
        self.root.join(format!("{}.{}", pid, COMMAND_EXT))
    }

    pub fn ack_path(&self, pid: u32) -> PathBuf {
        self.root.join(format!("{}.{}", pid, ACK_EXT))
    }

    /// Output snapshot of the worker called `name`
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, OUTPUT_EXT))
    }

    pub fn globals_path(&self) -> PathBuf {
        self.root.join(GLOBALS_FILE)
    }

    /// Create the directory and drop protocol files left behind by an earlier run
    pub fn create(&self) -> Result<(), ProtoError> {
        debug!("RuntimeDir::create: {}", self.root.display());
        fs::create_dir_all(&self.root).map_err(|e| ProtoError::io(&self.root, e))?;

        let entries = fs::read_dir(&self.root).map_err(|e| ProtoError::io(&self.root, e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            let stale = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some(COMMAND_EXT) | Some(ACK_EXT)
            );
            if stale {
                debug!("RuntimeDir::create: removing stale {}", path.display());
                let _ = fs::remove_file(&path);
            }
        }
        Ok(())
    }

    /// Remove the per-pid protocol files of a worker that is gone
    pub fn forget_pid(&self, pid: u32) {
        let _ = fs::remove_file(self.command_path(pid));
        let _ = fs::remove_file(self.ack_path(pid));
    }

    /// Remove the directory and everything in it
    pub fn remove(&self) -> Result<(), ProtoError> {
        if !self.root.exists() {
            return Ok(());
        }
        info!("Removing runtime directory {}", self.root.display());
        fs::remove_dir_all(&self.root).map_err(|e| ProtoError::io(&self.root, e))
    }
}
