//! Installer settings stored in `<root>/config.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mwi_core::{Error, ReleaseMatrix};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL replacing `http://downloads.sourceforge.net`.
    pub mirror: Option<String>,
    /// Path of the 7-Zip executable.
    pub seven_zip: Option<PathBuf>,
    /// JSON release table used instead of the built-in one.
    pub matrix_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load `<root>/config.json`; a missing file gives the defaults.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| Error::PackageFailure {
                message: format!("invalid config {}: {e}", path.display()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::PackageFailure {
                message: format!("failed to read {}: {e}", path.display()),
            }),
        }
    }

    /// Fields set in `other` win.
    pub fn merged(self, other: Config) -> Self {
        Self {
            mirror: other.mirror.or(self.mirror),
            seven_zip: other.seven_zip.or(self.seven_zip),
            matrix_file: other.matrix_file.or(self.matrix_file),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The release matrix this configuration selects.
    pub fn load_matrix(&self) -> Result<ReleaseMatrix, Error> {
        match &self.matrix_file {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| Error::InvalidMatrix {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                ReleaseMatrix::from_json(&text)
            }
            None => ReleaseMatrix::builtin(),
        }
    }
}
