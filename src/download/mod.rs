//! Download pipeline interface
//!
//! The service never produces stream files itself. A [`DownloadPipeline`]
//! resolves a name to a [`StreamDescriptor`] and keeps writing the file in the
//! background, announcing growth through a [`DownloadProgress`] watch.

mod inflight;
mod local;

use crate::error::PipelineError;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::watch;

pub use inflight::{InFlight, InFlightGuard};
pub use local::{is_plain_file_name, LocalPipeline};

/// Snapshot of a download's progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStatus {
    pub bytes_written: u64,
    pub finished: bool,
}

/// Receiving side of a download's progress
pub type DownloadProgress = watch::Receiver<DownloadStatus>;

/// Sending side of a download's progress, held by the pipeline
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<DownloadStatus>,
}

impl ProgressReporter {
    /// Record that the file now holds `bytes_written` bytes
    pub fn advance(&self, bytes_written: u64) {
        self.tx.send_modify(|status| status.bytes_written = bytes_written);
    }

    /// Mark the download complete; no more bytes will be appended
    pub fn finish(&self) {
        self.tx.send_modify(|status| status.finished = true);
    }
}

/// Create a linked reporter/progress pair for a download that is still running
pub fn progress_channel() -> (ProgressReporter, DownloadProgress) {
    let (tx, rx) = watch::channel(DownloadStatus::default());
    (ProgressReporter { tx }, rx)
}

/// Progress for a file that is already fully present on disk
pub fn finished_progress(size: u64) -> DownloadProgress {
    let (_tx, rx) = watch::channel(DownloadStatus {
        bytes_written: size,
        finished: true,
    });
    rx
}

/// Whether the download behind `progress` can still grow
///
/// A reporter that was dropped without calling `finish` can never announce
/// more bytes, so it counts as finished too.
pub fn is_finished(progress: &DownloadProgress) -> bool {
    progress.borrow().finished || progress.has_changed().is_err()
}

/// Metadata for a stream the pipeline knows how to fetch
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Name the stream was requested under
    pub name: String,
    /// File name the pipeline writes into, relative to the download directory
    pub file_name: String,
    pub progress: DownloadProgress,
}

pub type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = Result<StreamDescriptor, PipelineError>> + Send + 'a>>;

/// External download pipeline
pub trait DownloadPipeline: Send + Sync {
    /// Resolve `name` to a stream, starting its download if needed
    fn resolve<'a>(&'a self, name: &'a str) -> ResolveFuture<'a>;
}
