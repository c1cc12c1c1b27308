//! Toolchain installation: resolve, download, unpack, stage.
//!
//! The steps run strictly in order. Resolution happens before anything else
//! so an invalid combination never reaches the network.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use mwi_core::{Error, ReleaseEntry, ReleaseMatrix, ReleaseOptions, ToolchainEnv};

use crate::archive::ArchiveCache;
use crate::config::Config;
use crate::download::Downloader;
use crate::extract::SevenZip;
use crate::package::{InstallReceipt, InstalledPackage, PackageStore};
use crate::progress::{InstallProgress, ProgressCallback};
use crate::traits::{HttpClient, ReqwestHttpClient, Unpacker};

/// Outcome of [`Installer::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub release: ReleaseEntry,
    pub url: String,
    pub package_dir: PathBuf,
    pub env: ToolchainEnv,
    /// True if the package was already present and nothing was done
    pub already_installed: bool,
    /// Bytes fetched from the network (0 when the archive was cached)
    pub downloaded_bytes: u64,
}

/// Result of a cache cleanup
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupResult {
    pub archives_removed: Vec<String>,
    pub temp_files_removed: usize,
    pub bytes_freed: u64,
}

pub struct Installer {
    matrix: Arc<ReleaseMatrix>,
    downloader: Downloader,
    unpacker: Arc<dyn Unpacker>,
    store: PackageStore,
    work_dir: PathBuf,
}

impl Installer {
    pub fn new(
        matrix: Arc<ReleaseMatrix>,
        downloader: Downloader,
        unpacker: Arc<dyn Unpacker>,
        store: PackageStore,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            matrix,
            downloader,
            unpacker,
            store,
            work_dir,
        }
    }

    pub fn matrix(&self) -> &ReleaseMatrix {
        &self.matrix
    }

    pub fn resolve(&self, options: &ReleaseOptions) -> Result<&ReleaseEntry, Error> {
        self.matrix.resolve(options)
    }

    pub fn package_dir(&self, options: &ReleaseOptions) -> PathBuf {
        self.store.package_path(&options.package_key())
    }

    /// False for combinations the matrix does not offer.
    pub fn is_installed(&self, options: &ReleaseOptions) -> bool {
        self.matrix.contains(options) && self.store.has_package(&options.package_key())
    }

    pub fn list_installed(&self) -> Result<Vec<InstalledPackage>, Error> {
        self.store.list_packages().map_err(|e| Error::PackageFailure {
            message: format!("failed to list packages: {e}"),
        })
    }

    /// Environment for an installed toolchain.
    pub fn env_for(&self, options: &ReleaseOptions) -> Result<ToolchainEnv, Error> {
        self.matrix.resolve(options)?;
        let key = options.package_key();
        if !self.store.has_package(&key) {
            return Err(Error::NotInstalled { key });
        }
        Ok(ToolchainEnv::for_package(&self.store.package_path(&key)))
    }

    pub async fn install(
        &self,
        options: &ReleaseOptions,
        progress: Option<&ProgressCallback>,
    ) -> Result<InstallResult, Error> {
        let report = |event: InstallProgress| {
            if let Some(cb) = progress {
                cb(event);
            }
        };

        let release = self.matrix.resolve(options)?.clone();
        let key = options.package_key();
        let url = release.download_url();
        report(InstallProgress::Resolved {
            name: key.clone(),
            url: url.clone(),
        });

        if self.store.has_package(&key) {
            debug!(package = %key, "already installed");
            let package_dir = self.store.package_path(&key);
            return Ok(InstallResult {
                env: ToolchainEnv::for_package(&package_dir),
                release,
                url,
                package_dir,
                already_installed: true,
                downloaded_bytes: 0,
            });
        }

        report(InstallProgress::DownloadStarted { name: key.clone() });
        let file_name = release.archive_file_name();
        let fetched = self.downloader.fetch(&url, &file_name).await?;
        report(InstallProgress::DownloadCompleted {
            name: key.clone(),
            total_bytes: fetched.bytes,
            cached: fetched.cached,
        });

        fs::create_dir_all(&self.work_dir).map_err(|e| Error::PackageFailure {
            message: format!("failed to create work directory: {e}"),
        })?;
        let unpack_dir = tempfile::Builder::new()
            .prefix("unpack-")
            .tempdir_in(&self.work_dir)
            .map_err(|e| Error::PackageFailure {
                message: format!("failed to create unpack directory: {e}"),
            })?;

        report(InstallProgress::UnpackStarted { name: key.clone() });
        if let Err(e) = self.unpacker.unpack(&fetched.path, unpack_dir.path()) {
            // A broken archive must not be reused by the next attempt
            warn!(archive = %fetched.path.display(), "removing archive after failed extraction");
            let _ = self.downloader.cache().remove_archive(&file_name);
            return Err(e);
        }
        report(InstallProgress::UnpackCompleted { name: key.clone() });

        let receipt = InstallReceipt {
            release: release.clone(),
            url: url.clone(),
        };
        let package_dir = self.store.stage(&key, unpack_dir.path(), &receipt)?;
        info!(package = %key, path = %package_dir.display(), "installed");
        report(InstallProgress::InstallCompleted { name: key });

        Ok(InstallResult {
            env: ToolchainEnv::for_package(&package_dir),
            release,
            url,
            package_dir,
            already_installed: false,
            downloaded_bytes: if fetched.cached { 0 } else { fetched.bytes },
        })
    }

    /// Only combinations the matrix offers can be removed.
    pub fn uninstall(&self, options: &ReleaseOptions) -> Result<(), Error> {
        self.matrix.resolve(options)?;
        let key = options.package_key();
        if !self.store.remove_package(&key)? {
            return Err(Error::NotInstalled { key });
        }
        info!(package = %key, "uninstalled");
        Ok(())
    }

    /// Drop cached archives and leftover partial downloads.
    pub fn cleanup(&self, dry_run: bool) -> Result<CleanupResult, Error> {
        let cache = self.downloader.cache();
        let to_err = |e: std::io::Error| Error::PackageFailure {
            message: format!("failed to clean archive cache: {e}"),
        };

        if dry_run {
            let archives = cache.list_archives().map_err(to_err)?;
            return Ok(CleanupResult {
                bytes_freed: archives.iter().map(|(_, size)| size).sum(),
                archives_removed: archives.into_iter().map(|(name, _)| name).collect(),
                temp_files_removed: 0,
            });
        }

        let (archives_removed, archive_bytes) = cache.remove_all().map_err(to_err)?;
        let (temp_files_removed, temp_bytes) = cache.cleanup_temp_files().map_err(to_err)?;

        Ok(CleanupResult {
            archives_removed,
            temp_files_removed,
            bytes_freed: archive_bytes + temp_bytes,
        })
    }
}

fn root_error(root: &Path, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        Error::PackageFailure {
            message: format!(
                "cannot create root directory '{}': permission denied\n  hint: create it with 'sudo mkdir -p {} && sudo chown $USER {}' or pass --root",
                root.display(),
                root.display(),
                root.display()
            ),
        }
    } else {
        Error::PackageFailure {
            message: format!("failed to create root directory '{}': {e}", root.display()),
        }
    }
}

/// Wire an installer out of its collaborators under `root`.
pub fn create_installer_with(
    root: &Path,
    config: &Config,
    matrix: Arc<ReleaseMatrix>,
    http: Arc<dyn HttpClient>,
    unpacker: Arc<dyn Unpacker>,
) -> Result<Installer, Error> {
    fs::create_dir_all(root).map_err(|e| root_error(root, e))?;

    let cache = ArchiveCache::new(&root.join("cache")).map_err(|e| Error::PackageFailure {
        message: format!("failed to create archive cache: {e}"),
    })?;
    let store = PackageStore::new(root).map_err(|e| Error::PackageFailure {
        message: format!("failed to create package store: {e}"),
    })?;

    let downloader = Downloader::new(http, cache)
        .with_mirror(config.mirror.clone())
        .with_timeout(config.timeout());

    Ok(Installer::new(
        matrix,
        downloader,
        unpacker,
        store,
        root.join("work"),
    ))
}

/// Installer backed by reqwest and the system 7-Zip.
pub fn create_installer(root: &Path, config: &Config) -> Result<Installer, Error> {
    let matrix = Arc::new(config.load_matrix()?);
    create_installer_with(
        root,
        config,
        matrix,
        Arc::new(ReqwestHttpClient::new()),
        Arc::new(SevenZip::from_config(config.seven_zip.as_deref())),
    )
}
