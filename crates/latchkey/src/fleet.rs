//! Fleet snapshot file: loads a `MemoryFleet` for one invocation and writes
//! it back after commands that change controllers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use latchkey_core::{DeviceAccess, FleetSnapshot, MemoryFleet};

use crate::error::CliError;

#[derive(Debug)]
pub struct FleetFile {
    path: PathBuf,
    fleet: Arc<MemoryFleet>,
}

impl FleetFile {
    pub fn open(path: &Path) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CliError::FleetMissing {
                path: path.display().to_string(),
            },
            _ => CliError::Io(e),
        })?;

        let snapshot: FleetSnapshot =
            serde_json::from_str(&contents).map_err(|source| CliError::Json {
                path: path.display().to_string(),
                source,
            })?;
        debug!(path = %path.display(), devices = snapshot.devices.len(), "loaded fleet snapshot");

        Ok(Self {
            path: path.to_path_buf(),
            fleet: Arc::new(MemoryFleet::from_snapshot(snapshot)),
        })
    }

    /// The fleet as the engine's device backend.
    pub fn backend(&self) -> Arc<dyn DeviceAccess> {
        self.fleet.clone()
    }

    /// Write the current state back to the snapshot file. A no-op when no
    /// controller accepted a write.
    pub fn save(&self) -> Result<(), CliError> {
        if self.fleet.total_writes() == 0 {
            debug!(path = %self.path.display(), "no writes, snapshot left as is");
            return Ok(());
        }

        let snapshot = self.fleet.snapshot();
        let json = serde_json::to_string_pretty(&snapshot).map_err(|source| CliError::Json {
            path: self.path.display().to_string(),
            source,
        })?;
        std::fs::write(&self.path, json + "\n")?;
        debug!(path = %self.path.display(), "saved fleet snapshot");
        Ok(())
    }
}
