// Application state module
// Shared context handed to every request handler

use std::sync::Arc;

use super::types::Config;
use crate::download::{DownloadPipeline, InFlight};
use crate::handler::UploadLedger;
use crate::stream::ProducerConfig;

/// Application state
///
/// The only cross-request mutable state is `in_flight` and `uploads`; both
/// are changed one entry at a time at synchronous points.
pub struct AppState {
    pub config: Config,
    /// External download pipeline resolving stream names
    pub pipeline: Arc<dyn DownloadPipeline>,
    /// Names whose resolution is currently in progress
    pub in_flight: InFlight,
    /// Relocated uploads awaiting cleanup
    pub uploads: UploadLedger,
}

impl AppState {
    pub fn new(config: Config, pipeline: Arc<dyn DownloadPipeline>) -> Self {
        Self {
            config,
            pipeline,
            in_flight: InFlight::new(),
            uploads: UploadLedger::new(),
        }
    }

    pub const fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            chunk_size: self.config.stream.chunk_size,
            poll_interval: self.config.stream.poll_interval(),
        }
    }
}
