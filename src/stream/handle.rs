//! Exclusively owned file handle used by a single response

use hyper::body::Bytes;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Open, seekable byte source for a file on disk
///
/// Closing is idempotent: the underlying file is released the first time
/// [`FileHandle::close`] runs (or on drop) and never read afterwards.
#[derive(Debug)]
pub struct FileHandle {
    path: PathBuf,
    file: Option<File>,
    offset: u64,
}

impl FileHandle {
    /// Open `path` for reading at offset 0
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = File::open(&path).await?;
        Ok(Self {
            path,
            file: Some(file),
            offset: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn offset(&self) -> u64 {
        self.offset
    }

    pub const fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "file handle already closed")
        })
    }

    /// Current size and modification time, re-read from disk
    pub async fn stat(&self) -> io::Result<(u64, SystemTime)> {
        let file = self.file.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "file handle already closed")
        })?;
        let meta = file.metadata().await?;
        Ok((meta.len(), meta.modified()?))
    }

    /// Move the read position to `offset`
    pub async fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.file_mut()?.seek(SeekFrom::Start(offset)).await?;
        self.offset = offset;
        Ok(())
    }

    /// Read up to `max` bytes from the current offset
    ///
    /// An empty result means no bytes are available right now; a file that is
    /// still being written may have more later.
    pub async fn read_chunk(&mut self, max: usize) -> io::Result<Bytes> {
        let mut buf = vec![0; max];
        let n = self.file_mut()?.read(&mut buf).await?;
        buf.truncate(n);
        self.offset += n as u64;
        Ok(Bytes::from(buf))
    }

    /// Release the file; returns false if it was already closed
    pub fn close(&mut self) -> bool {
        self.file.take().is_some()
    }
}
