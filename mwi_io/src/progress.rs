/// Steps of a toolchain install, reported in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallProgress {
    Resolved { name: String, url: String },
    DownloadStarted { name: String },
    DownloadCompleted { name: String, total_bytes: u64, cached: bool },
    UnpackStarted { name: String },
    UnpackCompleted { name: String },
    InstallCompleted { name: String },
}

impl InstallProgress {
    pub fn name(&self) -> &str {
        match self {
            InstallProgress::Resolved { name, .. }
            | InstallProgress::DownloadStarted { name }
            | InstallProgress::DownloadCompleted { name, .. }
            | InstallProgress::UnpackStarted { name }
            | InstallProgress::UnpackCompleted { name }
            | InstallProgress::InstallCompleted { name } => name,
        }
    }
}

pub type ProgressCallback = Box<dyn Fn(InstallProgress) + Send + Sync>;
