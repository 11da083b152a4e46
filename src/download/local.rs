//! Pipeline backed by files already present in the download directory

use super::{finished_progress, DownloadPipeline, ResolveFuture, StreamDescriptor};
use crate::error::PipelineError;
use crate::logger;
use std::path::{Path, PathBuf};

/// Resolves a name to the file of the same name in the download directory
///
/// Used when no external downloader is attached; every stream it hands out
/// is already complete.
#[derive(Debug, Clone)]
pub struct LocalPipeline {
    download_directory: PathBuf,
}

impl LocalPipeline {
    pub fn new(download_directory: impl Into<PathBuf>) -> Self {
        Self {
            download_directory: download_directory.into(),
        }
    }

    async fn lookup(&self, name: &str) -> Result<StreamDescriptor, PipelineError> {
        if !is_plain_file_name(name) {
            return Err(PipelineError::UnknownName(name.to_string()));
        }

        let path = self.download_directory.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                logger::log_debug(&format!(
                    "Resolved '{name}' to {} ({} bytes)",
                    path.display(),
                    meta.len()
                ));
                Ok(StreamDescriptor {
                    name: name.to_string(),
                    file_name: name.to_string(),
                    progress: finished_progress(meta.len()),
                })
            }
            Ok(_) => Err(PipelineError::UnknownName(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PipelineError::UnknownName(name.to_string()))
            }
            Err(e) => Err(PipelineError::Unavailable(e.to_string())),
        }
    }
}

impl DownloadPipeline for LocalPipeline {
    fn resolve<'a>(&'a self, name: &'a str) -> ResolveFuture<'a> {
        Box::pin(self.lookup(name))
    }
}

/// True when `name` is a single normal path component
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}
