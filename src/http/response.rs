//! HTTP response building module
//!
//! Builders for the status responses the service emits. All of them return
//! the boxed [`ResponseBody`] so streamed and buffered bodies share one type.

use super::cache;
use super::{empty, full, ResponseBody};
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

fn fallback(status: &str, error: &hyper::http::Error) -> Response<ResponseBody> {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
    Response::new(empty())
}

fn build_text_response(status: StatusCode, text: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(full(text))
        .unwrap_or_else(|e| fallback(status.as_str(), &e))
}

/// Mark a response as never cacheable by browsers or intermediaries
pub fn apply_no_cache(response: &mut Response<ResponseBody>) {
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache::NO_CACHE),
    );
    headers.insert(
        header::EXPIRES,
        HeaderValue::from_static(cache::EXPIRES_NOW),
    );
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str, last_modified: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(header::ETAG, etag)
        .header(header::LAST_MODIFIED, last_modified)
        .body(empty())
        .unwrap_or_else(|e| fallback("304", &e))
}

/// Build 400 Bad Request response with a short reason
pub fn build_400_response(reason: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(full(format!("400 Bad Request: {reason}")))
        .unwrap_or_else(|e| fallback("400", &e))
}

/// Build 403 Forbidden response
pub fn build_403_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::FORBIDDEN, "403 Forbidden")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    let mut response =
        build_text_response(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed");
    response.headers_mut().insert(
        header::ALLOW,
        HeaderValue::from_static("GET, HEAD, POST, OPTIONS"),
    );
    response
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_RANGE, format!("bytes */{file_size}"))
        .body(full("416 Range Not Satisfiable"))
        .unwrap_or_else(|e| fallback("416", &e))
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
}

/// Build 502 Bad Gateway response
pub fn build_502_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::BAD_GATEWAY, "502 Bad Gateway")
}

/// Build 504 Gateway Timeout response
pub fn build_504_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::GATEWAY_TIMEOUT, "504 Gateway Timeout")
}

/// Build 302 redirect response
pub fn build_redirect_response(target: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, target)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(full("Redirecting..."))
        .unwrap_or_else(|e| fallback("302", &e))
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(header::ALLOW, "GET, HEAD, POST, OPTIONS");

    if enable_cors {
        builder = builder
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .header(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                "GET, HEAD, POST, OPTIONS",
            )
            .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Range")
            .header(header::ACCESS_CONTROL_MAX_AGE, "86400");
    }

    builder
        .body(empty())
        .unwrap_or_else(|e| fallback("OPTIONS", &e))
}

/// Build JSON response
pub fn build_json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    let json = match serde_json::to_string(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return build_500_response();
        }
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, json.len())
        .body(full(json))
        .unwrap_or_else(|e| fallback("JSON", &e))
}
