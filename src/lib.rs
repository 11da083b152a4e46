//! Local media streaming host
//!
//! Serves a web UI, streams files a download pipeline is still writing, and
//! accepts uploads that are relocated into fresh temporary directories.

pub mod config;
pub mod download;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod stream;
