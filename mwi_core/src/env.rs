use serde::Serialize;
use std::path::{Path, PathBuf};

/// Environment a consumer needs to use an installed toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainEnv {
    pub bin_dir: PathBuf,
    pub cc: PathBuf,
    pub cxx: PathBuf,
}

impl ToolchainEnv {
    pub fn for_package(package_dir: &Path) -> Self {
        let bin_dir = package_dir.join("bin");
        Self {
            cc: bin_dir.join("gcc.exe"),
            cxx: bin_dir.join("g++.exe"),
            bin_dir,
        }
    }

    /// Variables to set, in a stable order. PATH is handled separately since it
    /// extends rather than replaces.
    pub fn vars(&self) -> [(&'static str, &Path); 2] {
        [("CC", self.cc.as_path()), ("CXX", self.cxx.as_path())]
    }
}
