//! File streaming
//!
//! [`FileHandle`] owns an open file for one response and
//! [`StreamingProducer`] pushes its bytes into the response body.

mod handle;
mod producer;

pub use handle::FileHandle;
pub use producer::{ProducerConfig, StreamOutcome, StreamState, StreamingProducer};
