// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub paths: PathsConfig,
    pub ui: UiConfig,
    pub stream: StreamConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level written: error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds allowed for a client to send request headers
    pub header_read_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

/// Filesystem locations served by the application
#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Directory the download pipeline writes stream files into
    pub download_directory: PathBuf,
    /// Directory holding the web UI assets (`index.html` and friends)
    pub ui_directory: PathBuf,
}

/// Web UI configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    /// Base address redirects point at, e.g. `http://localhost:5279`
    pub address: String,
}

/// Hosted stream configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Maximum bytes read from disk per chunk
    pub chunk_size: usize,
    /// Upper bound on how long a producer sleeps waiting for a file to grow
    pub poll_interval_ms: u64,
    /// Name that never resolves and always redirects to the UI root
    pub reserved_name: String,
    /// Seconds allowed for the download pipeline to resolve a name
    pub resolve_timeout: u64,
}

impl StreamConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout)
    }
}

/// Upload configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UploadConfig {
    /// Parent for freshly created upload directories (system temp if unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}
