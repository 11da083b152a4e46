// Configuration module entry point
// Manages application configuration and shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, HttpConfig, LoggingConfig, PathsConfig, PerformanceConfig, ServerConfig,
    StreamConfig, UiConfig, UploadConfig,
};

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::builder()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SERVER").separator("__"))
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Built-in defaults only, no file or environment
    pub fn defaults() -> Result<Self, config::ConfigError> {
        Self::builder()?.build()?.try_deserialize::<Self>()?.validated()
    }

    /// Reject values that would stall or empty every stream
    fn validated(self) -> Result<Self, config::ConfigError> {
        if self.stream.chunk_size == 0 {
            return Err(config::ConfigError::Message(
                "stream.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.stream.poll_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "stream.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(self)
    }

    fn builder(
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5279)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("http.server_name", "streamhost")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 104_857_600)? // 100MB
            .set_default("paths.download_directory", "downloads")?
            .set_default("paths.ui_directory", "ui")?
            .set_default("ui.address", "http://localhost:5279")?
            .set_default("stream.chunk_size", 65_536)?
            .set_default("stream.poll_interval_ms", 250)?
            .set_default("stream.reserved_name", "lbry")?
            .set_default("stream.resolve_timeout", 30)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::defaults().unwrap();
        assert_eq!(cfg.server.port, 5279);
        assert_eq!(cfg.stream.reserved_name, "lbry");
        assert_eq!(cfg.stream.chunk_size, 65_536);
        assert_eq!(cfg.ui.address, "http://localhost:5279");
        assert!(cfg.upload.temp_dir.is_none());
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:5279".parse().unwrap()
        );
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9000\n\n[stream]\nreserved_name = \"sentinel\"\n",
        )
        .unwrap();

        let stem = dir.path().join("custom");
        let cfg = Config::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.stream.reserved_name, "sentinel");
        assert_eq!(cfg.stream.poll_interval_ms, 250);
    }

    fn load_stream_section(section: &str) -> Result<Config, config::ConfigError> {
        let dir = tempfile::tempdir().unwrap();
        let contents = format!("[stream]\n{section}\n");
        std::fs::write(dir.path().join("stream.toml"), contents).unwrap();
        Config::load_from(dir.path().join("stream").to_str().unwrap())
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = load_stream_section("chunk_size = 0").unwrap_err();
        assert!(err.to_string().contains("stream.chunk_size"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = load_stream_section("poll_interval_ms = 0").unwrap_err();
        assert!(err.to_string().contains("stream.poll_interval_ms"));
    }

    #[test]
    fn test_missing_file_is_optional() {
        let cfg = Config::load_from("/nonexistent/streamhost-config").unwrap();
        assert_eq!(cfg.http.server_name, "streamhost");
    }
}
