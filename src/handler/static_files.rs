//! Static file serving module
//!
//! [`StaticFileResponder`] serves one file with no-cache headers, conditional
//! GET short-circuiting, byte ranges and HEAD. The UI index and assets are
//! served through it.

use crate::error::ServeError;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, RangeParseResult, ResponseBody};
use crate::logger;
use crate::stream::{FileHandle, ProducerConfig, StreamingProducer};
use hyper::header;
use hyper::{Response, StatusCode};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

const INDEX_FILE: &str = "index.html";

/// Serves a single file from disk
pub struct StaticFileResponder {
    path: PathBuf,
    /// Type and encoding, resolved on first use and kept for this responder only
    content: OnceLock<(&'static str, Option<&'static str>)>,
}

impl StaticFileResponder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: OnceLock::new(),
        }
    }

    fn content_type(&self) -> (&'static str, Option<&'static str>) {
        *self
            .content
            .get_or_init(|| mime::resolve_type_and_encoding(&self.path))
    }

    /// Answer `ctx` from this file
    ///
    /// Every outcome, including errors, carries the no-cache headers.
    pub async fn respond(
        &self,
        ctx: &RequestContext<'_>,
        producer_config: ProducerConfig,
    ) -> Response<ResponseBody> {
        let mut response = match self.serve(ctx, producer_config).await {
            Ok(response) => response,
            Err(ServeError::NotFound) => http::build_404_response(),
            Err(ServeError::IsDirectory) => {
                let target = match ctx.query {
                    Some(q) => format!("{}/?{q}", ctx.path),
                    None => format!("{}/", ctx.path),
                };
                http::build_redirect_response(&target)
            }
            Err(ServeError::Forbidden) => {
                logger::log_warning(&format!(
                    "Permission denied opening {}",
                    self.path.display()
                ));
                http::build_403_response()
            }
            Err(ServeError::OpenFailure(e)) => {
                logger::log_error(&format!(
                    "Failed to open {}: {e}",
                    self.path.display()
                ));
                http::build_500_response()
            }
        };
        http::apply_no_cache(&mut response);
        response
    }

    async fn serve(
        &self,
        ctx: &RequestContext<'_>,
        producer_config: ProducerConfig,
    ) -> Result<Response<ResponseBody>, ServeError> {
        // Always re-stat: the file may have changed since the last request
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(ServeError::from_open)?;
        if meta.is_dir() {
            return Err(ServeError::IsDirectory);
        }
        let (content_type, encoding) = self.content_type();

        let mut handle = FileHandle::open(&self.path)
            .await
            .map_err(ServeError::from_open)?;

        let size = meta.len();
        let modified = meta.modified().map_err(ServeError::OpenFailure)?;
        let etag = cache::generate_etag(size, modified);
        let last_modified = cache::last_modified(modified);

        if cache::is_cache_hit(
            ctx.if_none_match.as_deref(),
            ctx.if_modified_since.as_deref(),
            &etag,
            modified,
        ) {
            handle.close();
            return Ok(http::build_304_response(&etag, &last_modified));
        }

        let range = match http::parse_range_header(ctx.range_header.as_deref(), size) {
            RangeParseResult::Valid(range) => Some(range),
            RangeParseResult::NotSatisfiable => {
                handle.close();
                return Ok(http::build_416_response(size));
            }
            RangeParseResult::None => None,
        };

        let mut builder = Response::builder()
            .header(header::CONTENT_TYPE, content_type)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::ETAG, &etag)
            .header(header::LAST_MODIFIED, &last_modified);
        if let Some(encoding) = encoding {
            builder = builder.header(header::CONTENT_ENCODING, encoding);
        }
        builder = match range {
            Some(r) => builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_LENGTH, r.len())
                .header(header::CONTENT_RANGE, r.content_range(size)),
            None => builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, size),
        };

        let body = if ctx.is_head {
            // Opened only to prove the file is readable
            handle.close();
            http::empty()
        } else {
            let (producer, body) =
                StreamingProducer::for_file(handle, size, range, producer_config)
                    .await
                    .map_err(ServeError::OpenFailure)?;
            producer.start();
            body
        };

        builder.body(body).map_err(|e| {
            ServeError::OpenFailure(std::io::Error::other(format!(
                "failed to build response: {e}"
            )))
        })
    }
}

/// Serve the UI entry point
pub async fn serve_index(
    ctx: &RequestContext<'_>,
    ui_dir: &Path,
    producer_config: ProducerConfig,
) -> Response<ResponseBody> {
    StaticFileResponder::new(ui_dir.join(INDEX_FILE))
        .respond(ctx, producer_config)
        .await
}

/// Serve a UI asset addressed by the request path
pub async fn serve_ui_asset(
    ctx: &RequestContext<'_>,
    ui_dir: &Path,
    producer_config: ProducerConfig,
) -> Response<ResponseBody> {
    let Some(path) = resolve_ui_path(ui_dir, ctx.path) else {
        let mut response = http::build_404_response();
        http::apply_no_cache(&mut response);
        return response;
    };
    StaticFileResponder::new(path)
        .respond(ctx, producer_config)
        .await
}

/// Map a request path onto a file under `ui_dir`
///
/// Returns `None` for paths that climb out of the directory, either
/// lexically or through a symlink. A trailing slash on a directory selects
/// its index file.
pub fn resolve_ui_path(ui_dir: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        logger::log_warning(&format!("Path traversal attempt blocked: {request_path}"));
        return None;
    }

    let mut file_path = ui_dir.join(relative);
    if request_path.ends_with('/') && file_path.is_dir() {
        file_path = file_path.join(INDEX_FILE);
    }

    // Nonexistent files are left for the responder to answer with 404
    if let (Ok(base), Ok(target)) = (ui_dir.canonicalize(), file_path.canonicalize()) {
        if !target.starts_with(&base) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {request_path} -> {}",
                target.display()
            ));
            return None;
        }
    }
    Some(file_path)
}
