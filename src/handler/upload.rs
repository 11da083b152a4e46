//! Upload resource
//!
//! `POST /upload` takes a multipart form with a `file` part and an optional
//! `file_filename` text part. The file is moved into a freshly created
//! directory under its original name and the new absolute path is returned
//! as a JSON string. Every relocated path is recorded in the
//! [`UploadLedger`] so it can be removed on shutdown.

use crate::config::AppState;
use crate::error::UploadError;
use crate::http::{self, ResponseBody};
use crate::logger;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::{self, HeaderMap};
use hyper::{Response, StatusCode};
use multer::{Constraints, Multipart, SizeLimit};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::{NamedTempFile, TempDir};
use tokio::io::AsyncWriteExt;

pub const UPLOAD_PATH: &str = "/upload";

const FILE_FIELD: &str = "file";
const FILE_NAME_FIELD: &str = "file_filename";

/// Relocated uploads awaiting cleanup
#[derive(Debug, Default)]
pub struct UploadLedger {
    paths: Mutex<Vec<PathBuf>>,
}

impl UploadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: PathBuf) {
        self.lock().push(path);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    /// Take every recorded path, leaving the ledger empty
    pub fn drain(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Remove relocated uploads and their directories, ignoring failures
///
/// Returns how many files were actually removed.
pub fn remove_uploads(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => logger::log_debug(&format!(
                "Could not remove upload {}: {e}",
                path.display()
            )),
        }
        if let Some(dir) = path.parent() {
            // Only succeeds once the directory is empty
            let _ = std::fs::remove_dir(dir);
        }
    }
    removed
}

/// Handle `POST /upload`
pub async fn handle_upload<B>(
    headers: &HeaderMap,
    body: B,
    state: &AppState,
) -> Response<ResponseBody>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match receive_upload(headers, body, state).await {
        Ok(path) => {
            logger::log_info(&format!("Stored upload at {}", path.display()));
            let response = http::build_json_response(StatusCode::OK, &path.to_string_lossy());
            state.uploads.record(path);
            response
        }
        Err(UploadError::Multipart(
            e @ (multer::Error::StreamSizeExceeded { .. }
            | multer::Error::FieldSizeExceeded { .. }),
        )) => {
            logger::log_warning(&format!("Upload rejected: {e}"));
            http::build_413_response()
        }
        Err(
            e @ (UploadError::Multipart(_)
            | UploadError::MissingField(_)
            | UploadError::InvalidName(_)),
        ) => {
            logger::log_warning(&format!("Upload rejected: {e}"));
            http::build_400_response(&e.to_string())
        }
        Err(e @ (UploadError::Stage(_) | UploadError::Move(_))) => {
            logger::log_error(&format!("Upload failed: {e}"));
            http::build_500_response()
        }
    }
}

async fn receive_upload<B>(
    headers: &HeaderMap,
    body: B,
    state: &AppState,
) -> Result<PathBuf, UploadError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let boundary = multer::parse_boundary(content_type)?;
    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(state.config.http.max_body_size));
    let mut multipart =
        Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut staged: Option<(NamedTempFile, Option<String>)> = None;
    let mut explicit_name: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let field_name = field.name().map(ToString::to_string);
        match field_name.as_deref() {
            Some(FILE_FIELD) if staged.is_none() => {
                let client_name = field.file_name().map(ToString::to_string);
                let file = stage_field(&mut field).await?;
                staged = Some((file, client_name));
            }
            Some(FILE_NAME_FIELD) => explicit_name = Some(field.text().await?),
            // Unread fields are skipped by the next call to next_field
            _ => {}
        }
    }

    let (file, client_name) = staged.ok_or(UploadError::MissingField(FILE_FIELD))?;
    let name = upload_file_name(explicit_name, client_name)?;
    store_upload(file, &name, state.config.upload.temp_dir.as_deref())
        .await
        .map_err(UploadError::Move)
}

/// Move a staged file into a fresh directory as `<dir>/<name>`
///
/// The directory is detached only after the file is in place; a failed move
/// removes it again.
async fn store_upload(
    staged: NamedTempFile,
    name: &str,
    parent: Option<&Path>,
) -> std::io::Result<PathBuf> {
    let dir = fresh_upload_dir(parent)?;
    let target = dir.path().join(name);
    relocate(staged, &target).await?;
    Ok(dir.keep().join(name))
}

/// Write one multipart field into a private temporary file
async fn stage_field(field: &mut multer::Field<'_>) -> Result<NamedTempFile, UploadError> {
    let staged = tempfile::Builder::new()
        .prefix("staged-")
        .tempfile()
        .map_err(UploadError::Stage)?;
    let std_file = staged.as_file().try_clone().map_err(UploadError::Stage)?;
    let mut out = tokio::fs::File::from_std(std_file);
    while let Some(chunk) = field.chunk().await? {
        out.write_all(&chunk).await.map_err(UploadError::Stage)?;
    }
    out.flush().await.map_err(UploadError::Stage)?;
    Ok(staged)
}

/// Pick the stored file name: the explicit form field wins, then the name
/// the client attached to the file part. Only the last path component of
/// either is kept.
fn upload_file_name(
    explicit: Option<String>,
    client_name: Option<String>,
) -> Result<String, UploadError> {
    let raw = explicit
        .filter(|n| !n.is_empty())
        .or(client_name)
        .ok_or(UploadError::MissingField(FILE_NAME_FIELD))?;
    let last = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    if last.is_empty() || last == "." || last == ".." {
        return Err(UploadError::InvalidName(raw));
    }
    Ok(last.to_string())
}

/// Create a new uniquely named directory, removed on drop until kept
fn fresh_upload_dir(parent: Option<&Path>) -> std::io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("upload-");
    match parent {
        Some(parent) => builder.tempdir_in(parent),
        None => builder.tempdir(),
    }
}

/// Move the staged file to `target`, copying when a rename is impossible
///
/// The staged file removes itself on drop if it is still in place.
async fn relocate(staged: NamedTempFile, target: &Path) -> std::io::Result<()> {
    if let Err(e) = tokio::fs::rename(staged.path(), target).await {
        logger::log_debug(&format!(
            "Rename of {} failed ({e}); copying instead",
            staged.path().display()
        ));
        tokio::fs::copy(staged.path(), target).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::test_state;
    use http_body_util::Full;
    use hyper::header::HeaderValue;

    const BOUNDARY: &str = "X-BOUNDARY";

    fn multipart_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={BOUNDARY}")).unwrap(),
        );
        headers
    }

    fn form(file: Option<(&str, &[u8])>, explicit_name: Option<&str>) -> Full<Bytes> {
        let mut body = Vec::new();
        if let Some((client_name, contents)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\n\
                     Content-Disposition: form-data; name=\"file\"; filename=\"{client_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(contents);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(name) = explicit_name {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\n\
                     Content-Disposition: form-data; name=\"file_filename\"\r\n\r\n{name}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Full::new(Bytes::from(body))
    }

    async fn json_path(response: Response<ResponseBody>) -> PathBuf {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        PathBuf::from(serde_json::from_slice::<String>(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_upload_relocates_and_records() {
        let (state, dirs) = test_state();
        let response = handle_upload(
            &multipart_headers(),
            form(Some(("blob", b"%PDF-1.4")), Some("report.pdf")),
            &state,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let path = json_path(response).await;
        assert!(path.is_absolute());
        assert_eq!(path.file_name().unwrap(), "report.pdf");
        assert!(path.starts_with(dirs.uploads.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
        assert_eq!(state.uploads.snapshot(), vec![path]);
    }

    #[tokio::test]
    async fn test_each_upload_gets_own_directory() {
        let (state, _dirs) = test_state();
        let mut paths = Vec::new();
        for _ in 0..2 {
            let response = handle_upload(
                &multipart_headers(),
                form(Some(("same.txt", b"x")), None),
                &state,
            )
            .await;
            paths.push(json_path(response).await);
        }
        assert_ne!(paths[0].parent(), paths[1].parent());
        assert_eq!(state.uploads.len(), 2);
    }

    #[tokio::test]
    async fn test_client_path_reduced_to_last_component() {
        let (state, _dirs) = test_state();
        let response = handle_upload(
            &multipart_headers(),
            form(Some((r"C:\\fakepath\\clip.mp4", b"data")), None),
            &state,
        )
        .await;
        assert_eq!(json_path(response).await.file_name().unwrap(), "clip.mp4");
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let (state, _dirs) = test_state();
        let response =
            handle_upload(&multipart_headers(), form(None, Some("report.pdf")), &state).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.uploads.is_empty());
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let (state, _dirs) = test_state();
        let response = handle_upload(&HeaderMap::new(), Full::new(Bytes::new()), &state).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upload_file_name() {
        assert_eq!(
            upload_file_name(Some("a.pdf".into()), Some("b.pdf".into())).unwrap(),
            "a.pdf"
        );
        assert_eq!(
            upload_file_name(Some(String::new()), Some("dir/b.pdf".into())).unwrap(),
            "b.pdf"
        );
        assert!(matches!(
            upload_file_name(None, None),
            Err(UploadError::MissingField(FILE_NAME_FIELD))
        ));
        assert!(matches!(
            upload_file_name(Some("x/..".into()), None),
            Err(UploadError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_move_leaves_no_directory() {
        let parent = tempfile::tempdir().unwrap();
        let staged = NamedTempFile::new().unwrap();
        // Nothing left to rename or copy
        std::fs::remove_file(staged.path()).unwrap();

        let result = store_upload(staged, "report.pdf", Some(parent.path())).await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_stored_upload_directory_is_kept() {
        let parent = tempfile::tempdir().unwrap();
        let mut staged = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut staged, b"kept").unwrap();

        let path = store_upload(staged, "a.txt", Some(parent.path())).await.unwrap();
        assert!(path.starts_with(parent.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"kept");
    }

    #[test]
    fn test_ledger_drain_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("upload-1");
        std::fs::create_dir(&upload_dir).unwrap();
        let file = upload_dir.join("a.txt");
        std::fs::write(&file, b"a").unwrap();

        let ledger = UploadLedger::new();
        ledger.record(file.clone());
        ledger.record(dir.path().join("upload-2/gone.txt"));

        let paths = ledger.drain();
        assert!(ledger.is_empty());
        assert_eq!(remove_uploads(&paths), 1);
        assert!(!file.exists());
        assert!(!upload_dir.exists());
    }
}
