//! Hosted stream resource
//!
//! `GET /stream?name=<name>` asks the download pipeline for `name` and streams
//! the file it writes while the download is still running. Concurrent
//! requests for a name that is still resolving are sent to the UI's watch
//! page instead of starting a second resolution.

use crate::config::AppState;
use crate::download::is_plain_file_name;
use crate::error::PipelineError;
use crate::handler::router::RequestContext;
use crate::http::query::{query_param, ui_root, watch_target};
use crate::http::{self, mime, ResponseBody};
use crate::logger;
use crate::stream::StreamingProducer;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};

pub const STREAM_PATH: &str = "/stream";

/// Serve a hosted stream request
///
/// Every response, redirects included, is sandboxed and marked uncacheable.
pub async fn serve_hosted(ctx: &RequestContext<'_>, state: &AppState) -> Response<ResponseBody> {
    let mut response = resolve_and_stream(ctx, state).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("sandbox"),
    );
    http::apply_no_cache(&mut response);
    response
}

async fn resolve_and_stream(ctx: &RequestContext<'_>, state: &AppState) -> Response<ResponseBody> {
    let ui_address = &state.config.ui.address;
    let Some(name) = query_param(ctx.query, "name") else {
        return http::build_redirect_response(&ui_root(ui_address));
    };
    if name == state.config.stream.reserved_name {
        return http::build_redirect_response(&ui_root(ui_address));
    }

    let Some(guard) = state.in_flight.try_begin(&name) else {
        logger::log_debug(&format!(
            "'{name}' is already resolving; redirecting to watch page"
        ));
        return http::build_redirect_response(&watch_target(ui_address, &name));
    };

    logger::log_info(&format!("Resolving stream '{name}'"));
    // Dropping this future mid-resolution (client gone) drops the guard too
    let resolved = tokio::time::timeout(
        state.config.stream.resolve_timeout(),
        state.pipeline.resolve(&name),
    )
    .await;
    drop(guard);

    let descriptor = match resolved {
        Ok(Ok(descriptor)) => descriptor,
        Ok(Err(PipelineError::UnknownName(_))) => {
            logger::log_info(&format!("No stream known for '{name}'"));
            return http::build_404_response();
        }
        Ok(Err(e @ PipelineError::Unavailable(_))) => {
            logger::log_error(&format!("Failed to resolve '{name}': {e}"));
            return http::build_502_response();
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Resolving '{name}' timed out after {}s",
                state.config.stream.resolve_timeout
            ));
            return http::build_504_response();
        }
    };

    if !is_plain_file_name(&descriptor.file_name) {
        logger::log_error(&format!(
            "Pipeline returned unusable file name '{}' for '{name}'",
            descriptor.file_name
        ));
        return http::build_502_response();
    }

    let path = state
        .config
        .paths
        .download_directory
        .join(&descriptor.file_name);
    let (content_type, encoding) = mime::resolve_type_and_encoding(&path);

    let body = if ctx.is_head {
        http::empty()
    } else {
        let (producer, body) =
            StreamingProducer::for_download(path, descriptor.progress, state.producer_config());
        producer.start();
        body
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(encoding) = encoding {
        builder = builder.header(header::CONTENT_ENCODING, encoding);
    }
    builder.body(body).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to build stream response: {e}"));
        http::build_500_response()
    })
}
