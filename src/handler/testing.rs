//! Shared fixtures for handler tests

use crate::config::{AppState, Config};
use crate::download::{DownloadPipeline, LocalPipeline};
use crate::handler::router::RequestContext;
use crate::stream::ProducerConfig;
use hyper::Method;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Directories backing a test [`AppState`]; removed on drop
pub struct TestDirs {
    pub ui: TempDir,
    pub downloads: TempDir,
    pub uploads: TempDir,
}

impl TestDirs {
    fn new() -> Self {
        Self {
            ui: tempfile::tempdir().unwrap(),
            downloads: tempfile::tempdir().unwrap(),
            uploads: tempfile::tempdir().unwrap(),
        }
    }
}

fn build(dirs: &TestDirs, pipeline: Arc<dyn DownloadPipeline>) -> Arc<AppState> {
    let mut config = Config::defaults().unwrap();
    config.logging.access_log = false;
    config.paths.ui_directory = dirs.ui.path().to_path_buf();
    config.paths.download_directory = dirs.downloads.path().to_path_buf();
    config.upload.temp_dir = Some(dirs.uploads.path().to_path_buf());
    config.stream.poll_interval_ms = 20;
    Arc::new(AppState::new(config, pipeline))
}

/// State backed by a [`LocalPipeline`] over the download directory
pub fn test_state() -> (Arc<AppState>, TestDirs) {
    let dirs = TestDirs::new();
    let pipeline = Arc::new(LocalPipeline::new(dirs.downloads.path()));
    (build(&dirs, pipeline), dirs)
}

pub fn test_state_with(pipeline: Arc<dyn DownloadPipeline>) -> (Arc<AppState>, TestDirs) {
    let dirs = TestDirs::new();
    (build(&dirs, pipeline), dirs)
}

pub const fn producer_config() -> ProducerConfig {
    ProducerConfig {
        chunk_size: 4096,
        poll_interval: Duration::from_millis(20),
    }
}

/// Conditional and range headers for [`context`]
#[derive(Default)]
pub struct HeaderSet<'a> {
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
    pub range: Option<&'a str>,
}

pub fn context<'a>(method: Method, path: &'a str, headers: HeaderSet<'_>) -> RequestContext<'a> {
    RequestContext {
        path,
        query: None,
        is_head: method == Method::HEAD,
        if_none_match: headers.if_none_match.map(ToString::to_string),
        if_modified_since: headers.if_modified_since.map(ToString::to_string),
        range_header: headers.range.map(ToString::to_string),
    }
}
