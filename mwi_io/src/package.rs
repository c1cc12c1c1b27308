use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use mwi_core::{Error, ReleaseEntry};

/// Root folders a mingw-builds archive may unpack to. Only one of them exists
/// for a given architecture.
pub const EXTRACTED_ROOTS: &[&str] = &["mingw32", "mingw64"];

pub const RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

/// Written into every installed package so it can be listed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub release: ReleaseEntry,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub key: String,
    pub path: PathBuf,
    pub receipt: InstallReceipt,
}

pub struct PackageStore {
    packages_dir: PathBuf,
    locks_dir: PathBuf,
}

impl PackageStore {
    pub fn new(root: &Path) -> io::Result<Self> {
        let packages_dir = root.join("packages");
        let locks_dir = root.join("locks");

        fs::create_dir_all(&packages_dir)?;
        fs::create_dir_all(&locks_dir)?;

        Ok(Self {
            packages_dir,
            locks_dir,
        })
    }

    pub fn package_path(&self, key: &str) -> PathBuf {
        self.packages_dir.join(key)
    }

    /// Package folder for `key`, refusing keys that would leave `packages/`.
    fn checked_path(&self, key: &str) -> Result<PathBuf, Error> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(Error::PackageFailure {
                message: format!("invalid package key '{key}'"),
            });
        }
        Ok(self.package_path(key))
    }

    pub fn has_package(&self, key: &str) -> bool {
        self.checked_path(key)
            .is_ok_and(|path| path.join(RECEIPT_FILE).exists())
    }

    fn lock(&self, key: &str) -> Result<File, Error> {
        let lock_path = self.locks_dir.join(format!("{key}.lock"));
        let lock_file = File::create(&lock_path).map_err(|e| Error::PackageFailure {
            message: format!("failed to create lock file: {e}"),
        })?;

        lock_file
            .lock_exclusive()
            .map_err(|e| Error::PackageFailure {
                message: format!("failed to acquire lock: {e}"),
            })?;

        Ok(lock_file)
    }

    /// Copy the unpacked toolchain under `extracted_root` into the package
    /// folder for `key` and record `receipt` there.
    pub fn stage(
        &self,
        key: &str,
        extracted_root: &Path,
        receipt: &InstallReceipt,
    ) -> Result<PathBuf, Error> {
        let package_path = self.checked_path(key)?;

        if self.has_package(key) {
            return Ok(package_path);
        }

        // Released when dropped
        let _lock = self.lock(key)?;

        if self.has_package(key) {
            return Ok(package_path);
        }

        let tmp_dir = self
            .packages_dir
            .join(format!(".{key}.tmp.{}", std::process::id()));
        if tmp_dir.exists() {
            let _ = fs::remove_dir_all(&tmp_dir);
        }

        if let Err(e) = populate(&tmp_dir, extracted_root, receipt) {
            let _ = fs::remove_dir_all(&tmp_dir);
            return Err(e);
        }

        // A folder without a receipt is a leftover from an interrupted install
        if package_path.exists() {
            let _ = fs::remove_dir_all(&package_path);
        }

        if let Err(e) = fs::rename(&tmp_dir, &package_path) {
            let _ = fs::remove_dir_all(&tmp_dir);
            return Err(Error::PackageFailure {
                message: format!("failed to move package into place: {e}"),
            });
        }

        Ok(package_path)
    }

    /// Returns false if nothing was installed under `key`.
    pub fn remove_package(&self, key: &str) -> Result<bool, Error> {
        let package_path = self.checked_path(key)?;
        if !package_path.exists() {
            return Ok(false);
        }

        let lock_path = self.locks_dir.join(format!("{key}.lock"));
        {
            let _lock = self.lock(key)?;
            if package_path.exists() {
                fs::remove_dir_all(&package_path).map_err(|e| Error::PackageFailure {
                    message: format!("failed to remove package: {e}"),
                })?;
            }
        }
        let _ = fs::remove_file(&lock_path);

        Ok(true)
    }

    pub fn read_receipt(&self, key: &str) -> Result<InstallReceipt, Error> {
        let path = self.checked_path(key)?.join(RECEIPT_FILE);
        let data = fs::read(&path).map_err(|_| Error::NotInstalled {
            key: key.to_string(),
        })?;
        serde_json::from_slice(&data).map_err(|e| Error::PackageFailure {
            message: format!("unreadable receipt {}: {e}", path.display()),
        })
    }

    /// Installed packages sorted by key. Folders without a readable receipt are
    /// skipped.
    pub fn list_packages(&self) -> io::Result<Vec<InstalledPackage>> {
        let mut packages = Vec::new();

        for entry in fs::read_dir(&self.packages_dir)? {
            let entry = entry?;
            let path = entry.path();

            let Some(key) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_dir() || key.starts_with('.') {
                continue;
            }

            match self.read_receipt(key) {
                Ok(receipt) => packages.push(InstalledPackage {
                    key: key.to_string(),
                    path: path.clone(),
                    receipt,
                }),
                Err(e) => warn!(package = key, error = %e, "skipping package"),
            }
        }

        packages.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(packages)
    }
}

fn populate(
    tmp_dir: &Path,
    extracted_root: &Path,
    receipt: &InstallReceipt,
) -> Result<(), Error> {
    fs::create_dir_all(tmp_dir).map_err(|e| Error::PackageFailure {
        message: format!("failed to create temp directory: {e}"),
    })?;

    let mut copied_any = false;
    for root in EXTRACTED_ROOTS {
        let src = extracted_root.join(root);
        if !src.is_dir() {
            continue;
        }
        debug!(src = %src.display(), "staging toolchain files");
        copy_tree(&src, tmp_dir)?;
        copied_any = true;
    }

    if !copied_any {
        return Err(Error::PackageFailure {
            message: format!(
                "archive contained none of {} under {}",
                EXTRACTED_ROOTS.join(", "),
                extracted_root.display()
            ),
        });
    }

    let json = serde_json::to_vec_pretty(receipt).map_err(|e| Error::PackageFailure {
        message: format!("failed to encode receipt: {e}"),
    })?;
    fs::write(tmp_dir.join(RECEIPT_FILE), json).map_err(|e| Error::PackageFailure {
        message: format!("failed to write receipt: {e}"),
    })
}

/// Copy the contents of `src` into `dst`, merging with what is already there.
/// Symlinks are copied as the files or folders they point at.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), Error> {
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| Error::PackageFailure {
            message: format!("failed to walk {}: {e}", src.display()),
        })?;

        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::PackageFailure {
                message: e.to_string(),
            })?;
        let target = dst.join(rel);

        let result = if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
        } else {
            fs::copy(entry.path(), &target).map(|_| ())
        };

        result.map_err(|e| Error::PackageFailure {
            message: format!("failed to copy {}: {e}", entry.path().display()),
        })?;
    }

    Ok(())
}
