use serde::{Deserialize, Serialize};

use crate::options::ReleaseOptions;
use crate::url::{archive_file_name, build_download_url};

/// One concrete, downloadable toolchain archive.
///
/// `sub_version`, `runtime_version` and `build_revision` come from the matrix
/// rule that produced the entry. They shape the download URL but are not part
/// of the lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    pub options: ReleaseOptions,
    #[serde(default)]
    pub sub_version: String,
    pub runtime_version: String,
    pub build_revision: String,
}

impl ReleaseEntry {
    pub fn new(
        options: ReleaseOptions,
        sub_version: impl Into<String>,
        runtime_version: impl Into<String>,
        build_revision: impl Into<String>,
    ) -> Self {
        Self {
            options,
            sub_version: sub_version.into(),
            runtime_version: runtime_version.into(),
            build_revision: build_revision.into(),
        }
    }

    /// Version as published upstream, e.g. "6.3" with sub version "0" is "6.3.0".
    pub fn display_version(&self) -> String {
        if self.sub_version.is_empty() {
            self.options.version.clone()
        } else {
            format!("{}.{}", self.options.version, self.sub_version)
        }
    }

    pub fn download_url(&self) -> String {
        build_download_url(self)
    }

    pub fn archive_file_name(&self) -> String {
        archive_file_name(self)
    }
}
