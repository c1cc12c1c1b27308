//! Test utilities for mingw-installer
//!
//! - `TestContext` - wraps a TempDir root, a wiremock mirror and an Installer
//! - `ManifestUnpacker` - stands in for 7-Zip, so tests need no real archives
//! - `mock_archive` - builds the archive bodies `ManifestUnpacker` understands
//!
//! # Example
//!
//! ```ignore
//! use mwi_io::test_utils::TestContext;
//!
//! #[tokio::test]
//! async fn test_install() {
//!     let ctx = TestContext::new().await;
//!     let options = ReleaseOptions::parse("6.3", "x86_64", "seh", "posix").unwrap();
//!     ctx.mount_toolchain(&options).await;
//!
//!     ctx.installer().install(&options, None).await.unwrap();
//!     assert!(ctx.installer().is_installed(&options));
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mwi_core::url::{DOWNLOAD_HOST, DOWNLOAD_SCHEME};
use mwi_core::{Architecture, Error, ReleaseMatrix, ReleaseOptions};

use crate::config::Config;
use crate::install::{Installer, create_installer_with};
use crate::traits::{ReqwestHttpClient, Unpacker};

/// Files every mock toolchain contains, relative to its root folder.
pub const TOOLCHAIN_FILES: &[&str] = &["bin/gcc.exe", "bin/g++.exe", "bin/mingw32-make.exe"];

/// Unpacks "archives" that are plain text lists of relative file paths,
/// creating each listed file under the destination.
pub struct ManifestUnpacker;

impl Unpacker for ManifestUnpacker {
    fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<(), Error> {
        let failed = |message: String| Error::ExtractionFailed {
            archive: archive.to_path_buf(),
            message,
        };

        let manifest = fs::read_to_string(archive).map_err(|e| failed(e.to_string()))?;
        for line in manifest.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let target = dest_dir.join(line);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
            }
            fs::write(&target, line.as_bytes()).map_err(|e| failed(e.to_string()))?;
        }
        Ok(())
    }
}

/// Body of a mock archive whose files live under `root_folder`.
pub fn mock_archive(root_folder: &str, files: &[&str]) -> Vec<u8> {
    files
        .iter()
        .map(|f| format!("{root_folder}/{f}\n"))
        .collect::<String>()
        .into_bytes()
}

/// Root folder a real archive for `arch` unpacks to.
pub fn root_folder(arch: Architecture) -> &'static str {
    match arch {
        Architecture::X86 => "mingw32",
        Architecture::X86_64 => "mingw64",
    }
}

/// Request path of `url` once it is served from a mirror.
pub fn mirror_path(url: &str) -> String {
    url.trim_start_matches(&format!("{DOWNLOAD_SCHEME}{DOWNLOAD_HOST}"))
        .to_string()
}

pub struct TestContext {
    pub tmp: TempDir,
    pub server: MockServer,
    installer: Installer,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_matrix(ReleaseMatrix::builtin().expect("builtin matrix")).await
    }

    pub async fn with_matrix(matrix: ReleaseMatrix) -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let server = MockServer::start().await;

        let config = Config {
            mirror: Some(server.uri()),
            ..Config::default()
        };
        let installer = create_installer_with(
            &tmp.path().join("root"),
            &config,
            Arc::new(matrix),
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(ManifestUnpacker),
        )
        .expect("installer");

        Self {
            tmp,
            server,
            installer,
        }
    }

    pub fn root(&self) -> PathBuf {
        self.tmp.path().join("root")
    }

    pub fn installer(&self) -> &Installer {
        &self.installer
    }

    /// Serve a toolchain archive for `options` laid out like upstream.
    pub async fn mount_toolchain(&self, options: &ReleaseOptions) {
        let body = mock_archive(root_folder(options.architecture), TOOLCHAIN_FILES);
        self.mount_archive(options, body).await;
    }

    pub async fn mount_archive(&self, options: &ReleaseOptions, body: Vec<u8>) {
        let entry = self
            .installer
            .resolve(options)
            .expect("options must be in the matrix");

        Mock::given(method("GET"))
            .and(path(mirror_path(&entry.download_url())))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&self.server)
            .await;
    }

    /// Every request for an archive fails with `status`.
    pub async fn mount_failure(&self, status: u16) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}
