//! Push-style producer that streams a (possibly growing) file into a response
//!
//! The producer runs as its own task and feeds the response body through a
//! bounded channel. Dropping the body (client disconnect) closes the channel,
//! which is the only cancellation signal: every read, wait and write races
//! against it, and whichever finishes first wins.

use super::FileHandle;
use crate::download::{finished_progress, is_finished, DownloadProgress};
use crate::http::{ByteRange, ResponseBody};
use crate::logger;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// Chunks buffered between the producer and the connection
const CHANNEL_CAPACITY: usize = 4;

type FrameSender = mpsc::Sender<Result<Frame<Bytes>, io::Error>>;

/// Tuning shared by all producers
#[derive(Debug, Clone, Copy)]
pub struct ProducerConfig {
    /// Maximum bytes per chunk
    pub chunk_size: usize,
    /// Longest wait for a growing file before reading again
    pub poll_interval: Duration,
}

/// Lifecycle of a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

/// Final report of a producer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOutcome {
    pub state: StreamState,
    pub bytes_sent: u64,
    /// No file handle is left open; false only if the handle had already
    /// been closed by someone else before the terminal transition
    pub handle_closed: bool,
}

/// Why streaming stopped early
enum Stop {
    Cancelled,
    Failed(io::Error),
}

/// Producer writing file bytes into one response body
pub struct StreamingProducer {
    path: PathBuf,
    handle: Option<FileHandle>,
    /// Exclusive end offset; `None` streams until the download finishes
    limit: Option<u64>,
    progress: DownloadProgress,
    config: ProducerConfig,
    tx: FrameSender,
    state: StreamState,
    bytes_sent: u64,
}

impl StreamingProducer {
    /// Producer over an already-open, complete file
    ///
    /// Streams `range` if given, otherwise the first `size` bytes.
    pub async fn for_file(
        mut handle: FileHandle,
        size: u64,
        range: Option<ByteRange>,
        config: ProducerConfig,
    ) -> io::Result<(Self, ResponseBody)> {
        let limit = match range {
            Some(r) => {
                handle.seek(r.start).await?;
                r.end + 1
            }
            None => size,
        };
        let path = handle.path().to_path_buf();
        Ok(Self::new(
            path,
            Some(handle),
            Some(limit),
            finished_progress(size),
            config,
        ))
    }

    /// Producer over a file the download pipeline may still be writing
    ///
    /// The file is opened lazily; it need not exist yet.
    pub fn for_download(
        path: PathBuf,
        progress: DownloadProgress,
        config: ProducerConfig,
    ) -> (Self, ResponseBody) {
        Self::new(path, None, None, progress, config)
    }

    fn new(
        path: PathBuf,
        handle: Option<FileHandle>,
        limit: Option<u64>,
        progress: DownloadProgress,
        config: ProducerConfig,
    ) -> (Self, ResponseBody) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let body = StreamBody::new(ReceiverStream::new(rx)).boxed();
        let producer = Self {
            path,
            handle,
            limit,
            progress,
            config,
            tx,
            state: StreamState::Idle,
            bytes_sent: 0,
        };
        (producer, body)
    }

    pub const fn state(&self) -> StreamState {
        self.state
    }

    /// Spawn the producer; the handle resolves to its final outcome
    pub fn start(self) -> JoinHandle<StreamOutcome> {
        tokio::spawn(self.run())
    }

    /// Drive the producer to a terminal state
    pub async fn run(mut self) -> StreamOutcome {
        self.state = StreamState::Streaming;
        let result = self.pump().await;

        // Terminal transition: the handle is released exactly here
        let offset = self.handle.as_ref().map_or(0, FileHandle::offset);
        let handle_closed = match self.handle.take() {
            Some(mut handle) => handle.close(),
            // Never opened: the file did not appear before the download ended
            None => true,
        };

        self.state = match result {
            Ok(()) => {
                logger::log_debug(&format!(
                    "Finished streaming {} ({} bytes)",
                    self.path.display(),
                    self.bytes_sent
                ));
                StreamState::Completed
            }
            Err(Stop::Cancelled) => {
                logger::log_debug(&format!(
                    "Client disconnected from {} at offset {offset}",
                    self.path.display()
                ));
                StreamState::Cancelled
            }
            Err(Stop::Failed(e)) => {
                logger::log_warning(&format!(
                    "Streaming {} failed at offset {offset}: {e}",
                    self.path.display()
                ));
                // Hand the error to the connection so it aborts instead of
                // ending the body as if it were complete
                tokio::select! {
                    biased;
                    () = self.tx.closed() => {}
                    _ = self.tx.send(Err(e)) => {}
                }
                StreamState::Failed
            }
        };

        StreamOutcome {
            state: self.state,
            bytes_sent: self.bytes_sent,
            handle_closed,
        }
    }

    async fn pump(&mut self) -> Result<(), Stop> {
        loop {
            // Sampled before reading: an empty read after the download was
            // already finished is a true end of file
            let finished = is_finished(&self.progress);

            if self.handle.is_none() {
                match FileHandle::open(&self.path).await {
                    Ok(handle) => self.handle = Some(handle),
                    Err(e) if e.kind() == io::ErrorKind::NotFound && !finished => {
                        self.wait_for_growth().await?;
                        continue;
                    }
                    Err(e) => return Err(Stop::Failed(e)),
                }
            }
            let Some(handle) = self.handle.as_mut() else {
                continue;
            };

            let want = match self.limit {
                Some(limit) => {
                    let left = limit.saturating_sub(handle.offset());
                    if left == 0 {
                        return Ok(());
                    }
                    usize::try_from(left).map_or(self.config.chunk_size, |left| {
                        left.min(self.config.chunk_size)
                    })
                }
                None => self.config.chunk_size,
            };

            let chunk = tokio::select! {
                biased;
                () = self.tx.closed() => return Err(Stop::Cancelled),
                read = handle.read_chunk(want) => read.map_err(Stop::Failed)?,
            };

            if chunk.is_empty() {
                if finished {
                    return match self.limit {
                        // The file ended before the declared length
                        Some(_) => Err(Stop::Failed(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "file truncated while streaming",
                        ))),
                        None => Ok(()),
                    };
                }
                self.wait_for_growth().await?;
                continue;
            }

            let len = chunk.len() as u64;
            if self.tx.send(Ok(Frame::data(chunk))).await.is_err() {
                return Err(Stop::Cancelled);
            }
            self.bytes_sent += len;
        }
    }

    /// Sleep until the download reports progress, the poll interval passes,
    /// or the client goes away
    async fn wait_for_growth(&mut self) -> Result<(), Stop> {
        tokio::select! {
            biased;
            () = self.tx.closed() => Err(Stop::Cancelled),
            // An error means the reporter is gone; the next pass sees the
            // download as finished
            _ = self.progress.changed() => Ok(()),
            () = tokio::time::sleep(self.config.poll_interval) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::progress_channel;
    use http_body_util::BodyExt;
    use std::io::Write;

    fn test_config() -> ProducerConfig {
        ProducerConfig {
            chunk_size: 4,
            poll_interval: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        let handle = FileHandle::open(&path).await.unwrap();
        let (producer, body) = StreamingProducer::for_file(handle, 10, None, test_config())
            .await
            .unwrap();
        assert_eq!(producer.state(), StreamState::Idle);
        let task = producer.start();

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"0123456789");

        let outcome = task.await.unwrap();
        assert_eq!(outcome.state, StreamState::Completed);
        assert_eq!(outcome.bytes_sent, 10);
        assert!(outcome.handle_closed);
    }

    #[tokio::test]
    async fn test_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        let handle = FileHandle::open(&path).await.unwrap();
        let range = ByteRange { start: 3, end: 8 };
        let (producer, body) = StreamingProducer::for_file(handle, 10, Some(range), test_config())
            .await
            .unwrap();
        let task = producer.start();

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"345678");
        assert_eq!(task.await.unwrap().bytes_sent, 6);
    }

    #[tokio::test]
    async fn test_growing_file_delivered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growing.bin");
        std::fs::write(&path, b"first-").unwrap();

        let (reporter, progress) = progress_channel();
        let (producer, body) =
            StreamingProducer::for_download(path.clone(), progress, test_config());
        let task = producer.start();

        let writer = tokio::spawn(async move {
            for part in [&b"second-"[..], b"third-", b"last"] {
                tokio::time::sleep(Duration::from_millis(30)).await;
                let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
                f.write_all(part).unwrap();
                reporter.advance(std::fs::metadata(&path).unwrap().len());
            }
            reporter.finish();
        });

        let bytes = body.collect().await.unwrap().to_bytes();
        writer.await.unwrap();
        assert_eq!(&bytes[..], b"first-second-third-last");

        let outcome = task.await.unwrap();
        assert_eq!(outcome.state, StreamState::Completed);
        assert_eq!(outcome.bytes_sent, 23);
    }

    #[tokio::test]
    async fn test_waits_for_file_to_appear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.bin");

        let (reporter, progress) = progress_channel();
        let (producer, body) =
            StreamingProducer::for_download(path.clone(), progress, test_config());
        let task = producer.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(&path, b"arrived").unwrap();
        reporter.finish();

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"arrived");
        assert_eq!(task.await.unwrap().state, StreamState::Completed);
    }

    #[tokio::test]
    async fn test_missing_file_after_finish_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.bin");

        let (producer, body) =
            StreamingProducer::for_download(path, finished_progress(0), test_config());
        let task = producer.start();

        assert!(body.collect().await.is_err());
        assert_eq!(task.await.unwrap().state, StreamState::Failed);
    }

    #[tokio::test]
    async fn test_disconnect_cancels_without_further_writes() {
        let config = test_config();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.bin");
        let contents: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &contents).unwrap();

        let handle = FileHandle::open(&path).await.unwrap();
        let size = contents.len() as u64;
        let (producer, mut body) = StreamingProducer::for_file(handle, size, None, config)
            .await
            .unwrap();
        let task = producer.start();

        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(&first[..], &contents[..config.chunk_size]);
        drop(body);

        let outcome = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("producer should stop after disconnect")
            .unwrap();
        assert_eq!(outcome.state, StreamState::Cancelled);
        assert!(outcome.handle_closed);
        // The received frame, a full channel and one send racing the drop
        let bound = (config.chunk_size * (CHANNEL_CAPACITY + 2)) as u64;
        assert!(
            outcome.bytes_sent <= bound,
            "sent {} bytes after disconnect, bound {bound}",
            outcome.bytes_sent
        );
    }

    #[tokio::test]
    async fn test_disconnect_while_waiting_for_growth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stalled.bin");
        std::fs::write(&path, b"abcd").unwrap();

        // Download never finishes, so the producer ends up waiting
        let (_reporter, progress) = progress_channel();
        let (producer, mut body) =
            StreamingProducer::for_download(path, progress, test_config());
        let task = producer.start();

        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(&first[..], b"abcd");
        drop(body);

        let outcome = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("producer should stop after disconnect")
            .unwrap();
        assert_eq!(outcome.state, StreamState::Cancelled);
        assert_eq!(outcome.bytes_sent, 4);
        assert!(outcome.handle_closed);
    }

    #[tokio::test]
    async fn test_truncated_file_fails_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        // Declared larger than what is on disk
        let handle = FileHandle::open(&path).await.unwrap();
        let (producer, body) = StreamingProducer::for_file(handle, 100, None, test_config())
            .await
            .unwrap();
        let task = producer.start();

        assert!(body.collect().await.is_err());
        let outcome = task.await.unwrap();
        assert_eq!(outcome.state, StreamState::Failed);
        assert_eq!(outcome.bytes_sent, 10);
        assert!(outcome.handle_closed);
    }
}
