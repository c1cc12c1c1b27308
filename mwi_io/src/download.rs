use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use mwi_core::Error;
use mwi_core::url::{DOWNLOAD_HOST, DOWNLOAD_SCHEME};

use crate::archive::ArchiveCache;
use crate::traits::HttpClient;

/// A fetched archive and whether it came from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub path: PathBuf,
    pub bytes: u64,
    pub cached: bool,
}

pub struct Downloader {
    http: Arc<dyn HttpClient>,
    cache: ArchiveCache,
    mirror: Option<String>,
    timeout: Option<Duration>,
}

impl Downloader {
    pub fn new(http: Arc<dyn HttpClient>, cache: ArchiveCache) -> Self {
        Self {
            http,
            cache,
            mirror: None,
            timeout: None,
        }
    }

    /// Serve downloads from `mirror` instead of the SourceForge host. The
    /// project path stays the same.
    pub fn with_mirror(mut self, mirror: Option<String>) -> Self {
        self.mirror = mirror.map(|m| m.trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    /// The URL actually requested for `url` once the mirror is applied.
    pub fn effective_url(&self, url: &str) -> String {
        let upstream = format!("{DOWNLOAD_SCHEME}{DOWNLOAD_HOST}");
        match &self.mirror {
            Some(mirror) if url.starts_with(&upstream) => {
                format!("{}{}", mirror, &url[upstream.len()..])
            }
            _ => url.to_string(),
        }
    }

    /// Fetch `url` into the archive cache as `file_name`. A cached archive is
    /// returned without touching the network.
    pub async fn fetch(&self, url: &str, file_name: &str) -> Result<FetchedArchive, Error> {
        if self.cache.has_archive(file_name) {
            let path = self.cache.archive_path(file_name);
            let bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            debug!(file = file_name, "using cached archive");
            return Ok(FetchedArchive {
                path,
                bytes,
                cached: true,
            });
        }

        let url = self.effective_url(url);
        info!(%url, "downloading");

        let body = match self.timeout {
            Some(timeout) => self.http.get_with_timeout(&url, timeout).await?,
            None => self.http.get(&url).await?,
        };

        let mut writer = self
            .cache
            .start_write(file_name)
            .map_err(|e| Error::NetworkFailure {
                message: format!("failed to create archive file: {e}"),
            })?;
        writer.write_all(&body).map_err(|e| Error::NetworkFailure {
            message: format!("failed to write archive: {e}"),
        })?;
        let path = writer.commit()?;

        debug!(path = %path.display(), bytes = body.len(), "archive stored");
        Ok(FetchedArchive {
            path,
            bytes: body.len() as u64,
            cached: false,
        })
    }
}
