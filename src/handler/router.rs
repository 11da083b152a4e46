//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation,
//! route matching, and dispatching.

use crate::config::AppState;
use crate::handler::{hosted, static_files, upload};
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use hyper::body::{Body, Bytes};
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    /// Raw query string without the leading `?`
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub range_header: Option<String>,
}

impl<'a> RequestContext<'a> {
    pub fn new(method: &Method, uri: &'a hyper::Uri, headers: &HeaderMap) -> Self {
        let header = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            path: uri.path(),
            query: uri.query(),
            is_head: *method == Method::HEAD,
            if_none_match: header(header::IF_NONE_MATCH),
            if_modified_since: header(header::IF_MODIFIED_SINCE),
            range_header: header(header::RANGE),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let mut entry = state
        .config
        .logging
        .access_log
        .then(|| AccessLogEntry::from_request(&req, peer));

    let (parts, body) = req.into_parts();
    let mut response = match parts.method {
        Method::GET | Method::HEAD => {
            let ctx = RequestContext::new(&parts.method, &parts.uri, &parts.headers);
            route_request(&ctx, &state).await
        }
        Method::POST if parts.uri.path() == upload::UPLOAD_PATH => {
            match check_body_size(&parts.headers, state.config.http.max_body_size) {
                Some(resp) => resp,
                None => upload::handle_upload(&parts.headers, body, &state).await,
            }
        }
        Method::OPTIONS => http::build_options_response(state.config.http.enable_cors),
        ref method => {
            logger::log_warning(&format!("Method not allowed: {method} {}", parts.uri.path()));
            http::build_405_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(header::SERVER, value);
    }

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.elapsed = started.elapsed();
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<ResponseBody>> {
    let content_length = headers.get(header::CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Route a GET or HEAD request by path
async fn route_request(ctx: &RequestContext<'_>, state: &AppState) -> Response<ResponseBody> {
    let ui_dir = &state.config.paths.ui_directory;
    match ctx.path {
        "/" => static_files::serve_index(ctx, ui_dir, state.producer_config()).await,
        hosted::STREAM_PATH => hosted::serve_hosted(ctx, state).await,
        _ => static_files::serve_ui_asset(ctx, ui_dir, state.producer_config()).await,
    }
}
