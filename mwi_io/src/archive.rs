use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mwi_core::Error;

const ARCHIVE_EXT: &str = ".7z";

/// Downloaded toolchain archives, keyed by their upstream file name.
#[derive(Clone)]
pub struct ArchiveCache {
    archives_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl ArchiveCache {
    pub fn new(cache_root: &Path) -> io::Result<Self> {
        let archives_dir = cache_root.join("archives");
        let tmp_dir = cache_root.join("tmp");

        fs::create_dir_all(&archives_dir)?;
        fs::create_dir_all(&tmp_dir)?;

        Ok(Self {
            archives_dir,
            tmp_dir,
        })
    }

    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.archives_dir.join(file_name)
    }

    pub fn has_archive(&self, file_name: &str) -> bool {
        self.archive_path(file_name).exists()
    }

    /// Remove an archive (used when extraction fails on a corrupt download)
    pub fn remove_archive(&self, file_name: &str) -> io::Result<bool> {
        let path = self.archive_path(file_name);
        if path.exists() {
            fs::remove_file(&path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn start_write(&self, file_name: &str) -> io::Result<ArchiveWriter> {
        let final_path = self.archive_path(file_name);
        let tmp_path = self
            .tmp_dir
            .join(format!("{file_name}.{}.part", std::process::id()));

        let file = fs::File::create(&tmp_path)?;

        Ok(ArchiveWriter {
            file,
            tmp_path,
            final_path,
            committed: false,
        })
    }

    /// List cached archives as (file name, size in bytes) pairs, sorted by name
    pub fn list_archives(&self) -> io::Result<Vec<(String, u64)>> {
        let mut archives = Vec::new();

        for entry in fs::read_dir(&self.archives_dir)? {
            let entry = entry?;
            let path = entry.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && name.ends_with(ARCHIVE_EXT)
                && let Ok(metadata) = entry.metadata()
                && metadata.is_file()
            {
                archives.push((name.to_string(), metadata.len()));
            }
        }

        archives.sort();
        Ok(archives)
    }

    pub fn total_size(&self) -> io::Result<u64> {
        Ok(self.list_archives()?.iter().map(|(_, size)| size).sum())
    }

    /// Remove every cached archive.
    /// Returns the removed file names and the total bytes freed
    pub fn remove_all(&self) -> io::Result<(Vec<String>, u64)> {
        let mut removed = Vec::new();
        let mut bytes_freed = 0;

        for (name, size) in self.list_archives()? {
            if fs::remove_file(self.archive_path(&name)).is_ok() {
                removed.push(name);
                bytes_freed += size;
            }
        }

        Ok((removed, bytes_freed))
    }

    /// Clean up stale `.part` files left by interrupted downloads.
    /// Returns the number of files removed and bytes freed
    pub fn cleanup_temp_files(&self) -> io::Result<(usize, u64)> {
        let mut count = 0;
        let mut bytes_freed = 0;

        for entry in fs::read_dir(&self.tmp_dir)? {
            let entry = entry?;
            let path = entry.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && name.ends_with(".part")
                && let Ok(metadata) = entry.metadata()
            {
                let size = metadata.len();
                if fs::remove_file(&path).is_ok() {
                    count += 1;
                    bytes_freed += size;
                }
            }
        }

        Ok((count, bytes_freed))
    }
}

pub struct ArchiveWriter {
    file: fs::File,
    tmp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl ArchiveWriter {
    pub fn commit(mut self) -> Result<PathBuf, Error> {
        self.file.flush().map_err(|e| Error::NetworkFailure {
            message: format!("failed to flush archive: {e}"),
        })?;

        if let Err(e) = fs::rename(&self.tmp_path, &self.final_path) {
            // Another process finished the same download first
            if self.final_path.exists() {
                let _ = fs::remove_file(&self.tmp_path);
            } else {
                return Err(Error::NetworkFailure {
                    message: format!("failed to store archive: {e}"),
                });
            }
        }

        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Write for ArchiveWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        if !self.committed && self.tmp_path.exists() {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}
