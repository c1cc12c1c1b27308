//! Archive extraction through an external 7-Zip binary.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use tracing::debug;

use mwi_core::Error;

use crate::traits::Unpacker;

/// Program names tried, in order, when no explicit 7-Zip path is configured.
const SEVEN_ZIP_CANDIDATES: &[&str] = &["7z", "7za", "7zr"];

/// Runs `7z x`. Without an explicit program the first candidate answering on
/// PATH is used. It is looked up once, when the first archive is unpacked; a
/// failed lookup is retried on the next unpack.
pub struct SevenZip {
    program: Option<PathBuf>,
    found: OnceLock<PathBuf>,
}

impl SevenZip {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
            found: OnceLock::new(),
        }
    }

    pub fn from_path_lookup() -> Self {
        Self {
            program: None,
            found: OnceLock::new(),
        }
    }

    pub fn from_config(configured: Option<&Path>) -> Self {
        match configured {
            Some(program) => Self::new(program),
            None => Self::from_path_lookup(),
        }
    }

    pub fn program(&self) -> Result<PathBuf, Error> {
        if let Some(program) = &self.program {
            return Ok(program.clone());
        }
        if let Some(found) = self.found.get() {
            return Ok(found.clone());
        }

        let found = SEVEN_ZIP_CANDIDATES
            .iter()
            .find(|name| responds(Path::new(name)))
            .map(PathBuf::from)
            .ok_or_else(|| Error::ExtractionFailed {
                archive: PathBuf::new(),
                message: format!(
                    "no 7-Zip executable found (tried {})\n  hint: install p7zip or pass --seven-zip",
                    SEVEN_ZIP_CANDIDATES.join(", ")
                ),
            })?;
        debug!(program = %found.display(), "found 7-Zip on PATH");
        Ok(self.found.get_or_init(|| found).clone())
    }
}

fn responds(program: &Path) -> bool {
    // 7z prints usage and exits 0 with no arguments
    Command::new(program)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

impl Unpacker for SevenZip {
    fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<(), Error> {
        let program = self.program().map_err(|e| match e {
            Error::ExtractionFailed { message, .. } => Error::ExtractionFailed {
                archive: archive.to_path_buf(),
                message,
            },
            other => other,
        })?;

        debug!(
            program = %program.display(),
            archive = %archive.display(),
            dest = %dest_dir.display(),
            "running 7-Zip"
        );

        let mut out_flag = std::ffi::OsString::from("-o");
        out_flag.push(dest_dir);

        let output = Command::new(&program)
            .arg("x")
            .arg(archive)
            .arg(out_flag)
            .arg("-y")
            .output()
            .map_err(|e| Error::ExtractionFailed {
                archive: archive.to_path_buf(),
                message: format!("failed to run {}: {e}", program.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExtractionFailed {
                archive: archive.to_path_buf(),
                message: format!(
                    "{} exited with {}: {}",
                    program.display(),
                    output.status,
                    stderr.trim()
                ),
            });
        }

        Ok(())
    }
}
