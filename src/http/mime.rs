//! MIME type detection module
//!
//! Maps a file name to its `Content-Type` and, for compressed files, its
//! `Content-Encoding`.

use std::path::Path;

/// Get MIME Content-Type based on file extension
///
/// # Examples
/// ```
/// use streamhost::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), "text/html; charset=utf-8");
/// assert_eq!(get_content_type(Some("MP4")), "video/mp4");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return "application/octet-stream";
    };
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "wasm" => "application/wasm",
        "map" => "application/json",

        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "flv" => "video/x-flv",

        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",

        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "tar" => "application/x-tar",

        _ => "application/octet-stream",
    }
}

/// Get the `Content-Encoding` implied by a compression extension
pub fn get_content_encoding(extension: Option<&str>) -> Option<&'static str> {
    match extension?.to_ascii_lowercase().as_str() {
        "gz" => Some("gzip"),
        "bz2" => Some("bzip2"),
        _ => None,
    }
}

/// Resolve type and encoding from a file name
///
/// A compression suffix becomes the encoding and the type is taken from the
/// extension before it, so `app.js.gz` is JavaScript encoded with gzip.
pub fn resolve_type_and_encoding(file_name: &Path) -> (&'static str, Option<&'static str>) {
    let extension = |p: &Path| {
        p.extension()
            .and_then(|e| e.to_str())
            .map(ToString::to_string)
    };

    let outer = extension(file_name);
    match get_content_encoding(outer.as_deref()) {
        Some(encoding) => {
            let inner = file_name
                .file_stem()
                .map(Path::new)
                .and_then(extension);
            (get_content_type(inner.as_deref()), Some(encoding))
        }
        None => (get_content_type(outer.as_deref()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(get_content_type(Some("html")), "text/html; charset=utf-8");
        assert_eq!(get_content_type(Some("js")), "application/javascript");
        assert_eq!(get_content_type(Some("mp4")), "video/mp4");
        assert_eq!(get_content_type(Some("PDF")), "application/pdf");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("xyz")), "application/octet-stream");
        assert_eq!(get_content_type(None), "application/octet-stream");
    }

    #[test]
    fn test_resolve_type_and_encoding() {
        assert_eq!(
            resolve_type_and_encoding(Path::new("movie.mp4")),
            ("video/mp4", None)
        );
        assert_eq!(
            resolve_type_and_encoding(Path::new("/ui/app.js.gz")),
            ("application/javascript", Some("gzip"))
        );
        assert_eq!(
            resolve_type_and_encoding(Path::new("dump.bz2")),
            ("application/octet-stream", Some("bzip2"))
        );
        assert_eq!(
            resolve_type_and_encoding(Path::new("README")),
            ("application/octet-stream", None)
        );
    }
}
