pub mod archive;
pub mod config;
pub mod download;
pub mod extract;
pub mod install;
pub mod package;
pub mod progress;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use archive::ArchiveCache;
pub use config::Config;
pub use download::{Downloader, FetchedArchive};
pub use extract::SevenZip;
pub use install::{CleanupResult, InstallResult, Installer, create_installer, create_installer_with};
pub use package::{InstallReceipt, InstalledPackage, PackageStore};
pub use progress::{InstallProgress, ProgressCallback};
pub use traits::{HttpClient, ReqwestHttpClient, Unpacker};
