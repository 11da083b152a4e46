//! Request handler module
//!
//! Responsible for request routing dispatch and the resources behind it:
//! the UI index and assets, hosted streams and uploads.

pub mod hosted;
pub mod router;
pub mod static_files;
pub mod upload;

#[cfg(test)]
mod testing;

// Re-export main entry point
pub use router::handle_request;
pub use static_files::StaticFileResponder;
pub use upload::{remove_uploads, UploadLedger};
