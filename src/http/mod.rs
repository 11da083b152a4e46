//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! resources that use it.

pub mod cache;
pub mod mime;
pub mod query;
pub mod range;
pub mod response;

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;

// Re-export commonly used types
pub use range::{parse_range_header, ByteRange, RangeParseResult};
pub use response::{
    apply_no_cache, build_304_response, build_400_response, build_403_response,
    build_404_response, build_405_response, build_413_response, build_416_response,
    build_500_response, build_502_response, build_504_response, build_json_response,
    build_options_response, build_redirect_response,
};

/// Body type of every response; streamed bodies surface I/O errors so the
/// connection is aborted mid-stream
pub type ResponseBody = BoxBody<Bytes, std::io::Error>;

/// Buffered body holding `data`
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// Body with no bytes
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}
