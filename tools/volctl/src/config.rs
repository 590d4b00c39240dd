//! Array configuration: where the simulated devices live on disk and how
//! big each one is. Populated from CLI flags, optionally layered over a TOML
//! file for repeatable scripted demonstrations.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// The geometry and device paths `volctl` assembles against.
#[derive(Debug, Clone, Deserialize)]
pub struct VolctlConfig {
    /// Paths to the backing files, one per device, in device-index order.
    pub device_paths: Vec<PathBuf>,
    /// Sectors per device (the design's `S`).
    pub sectors_per_device: u64,
}

impl VolctlConfig {
    /// Loads a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse as a
    /// valid `VolctlConfig`.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Device count (`D`), derived from the number of configured paths.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.device_paths.len()
    }
}
