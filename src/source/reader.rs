use flate2::read::MultiGzDecoder;
use std::io::{BufRead, BufReader, Read};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::io::SyncIoBridge;
use tracing::debug;

/// Longest line accepted by default, excluding its terminator.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum LineSourceError {
    #[error("decompression error: {0}")]
    Decompression(#[source] std::io::Error),

    #[error("error reading object stream: {0}")]
    StreamRead(#[source] std::io::Error),

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("line source stopped without reaching end of stream")]
    Interrupted,
}

impl From<std::io::Error> for LineSourceError {
    /// Corrupt or truncated gzip data is a decompression error; anything the
    /// underlying stream reports is a read error.
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidData | ErrorKind::InvalidInput | ErrorKind::UnexpectedEof => {
                LineSourceError::Decompression(e)
            }
            _ => LineSourceError::StreamRead(e),
        }
    }
}

/// Item passed from the decompression worker to the reader
#[derive(Debug)]
enum Frame {
    Line(String),
    Eof,
}

/// Lazy, forward-only sequence of lines from a gzip-compressed byte stream.
///
/// Decompression runs on the blocking pool and hands lines over a bounded
/// channel, so the object is never held in memory as a whole. The source
/// yields lines in file order followed by exactly one terminal event: end of
/// stream (`Ok(None)`) or an error. Every call after the terminal event
/// returns `Ok(None)`.
pub struct LineSource {
    frames: mpsc::Receiver<Result<Frame, LineSourceError>>,
    lines_read: u64,
    finished: bool,
}

impl LineSource {
    /// Start decompressing `reader`. Must be called from within a tokio runtime.
    pub fn spawn<R>(reader: R, buffer: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::spawn_with_limit(reader, buffer, DEFAULT_MAX_LINE_BYTES)
    }

    /// Like `spawn`, failing the stream on any line longer than `max_line_bytes`.
    pub fn spawn_with_limit<R>(reader: R, buffer: usize, max_line_bytes: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let bridge = SyncIoBridge::new(reader);

        tokio::task::spawn_blocking(move || {
            let terminal = match decode_lines(bridge, max_line_bytes.max(1), &tx) {
                Ok(true) => Ok(Frame::Eof),
                Ok(false) => return,
                Err(e) => Err(e),
            };
            let _ = tx.blocking_send(terminal);
        });

        Self {
            frames: rx,
            lines_read: 0,
            finished: false,
        }
    }

    /// Next raw line, without its line terminator.
    pub async fn next_line(&mut self) -> Result<Option<String>, LineSourceError> {
        if self.finished {
            return Ok(None);
        }

        match self.frames.recv().await {
            Some(Ok(Frame::Line(line))) => {
                self.lines_read += 1;
                Ok(Some(line))
            }
            Some(Ok(Frame::Eof)) => {
                self.finished = true;
                debug!(lines = self.lines_read, "Line source reached end of stream");
                Ok(None)
            }
            Some(Err(e)) => {
                self.finished = true;
                Err(e)
            }
            None => {
                self.finished = true;
                Err(LineSourceError::Interrupted)
            }
        }
    }

    /// Number of lines handed out so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Decompress and split `reader` into lines, sending each over `tx`.
///
/// Returns `Ok(false)` when the receiving side went away before the end of
/// the stream. At most `max_line_bytes + 1` bytes of a line are buffered.
fn decode_lines<R: Read>(
    reader: R,
    max_line_bytes: usize,
    tx: &mpsc::Sender<Result<Frame, LineSourceError>>,
) -> Result<bool, LineSourceError> {
    let mut decoder = BufReader::new(MultiGzDecoder::new(reader));
    let mut buf = Vec::new();
    let window = max_line_bytes as u64 + 1;

    loop {
        buf.clear();
        if (&mut decoder).take(window).read_until(b'\n', &mut buf)? == 0 {
            return Ok(true);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if buf.len() > max_line_bytes {
            return Err(LineSourceError::LineTooLong {
                limit: max_line_bytes,
            });
        }

        let line = String::from_utf8_lossy(&buf).into_owned();
        if tx.blocking_send(Ok(Frame::Line(line))).is_err() {
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    fn gzip(content: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }

    async fn collect(source: &mut LineSource) -> Result<Vec<String>, LineSourceError> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().await? {
            lines.push(line);
        }
        Ok(lines)
    }

    #[tokio::test]
    async fn test_lines_in_file_order() {
        let data = gzip(b"first\nsecond\nthird\n");
        let mut source = LineSource::spawn(Cursor::new(data), 2);

        let lines = collect(&mut source).await.unwrap();
        assert_eq!(lines, vec!["first", "second", "third"]);
        assert_eq!(source.lines_read(), 3);
        assert!(source.is_finished());
    }

    #[tokio::test]
    async fn test_last_line_without_terminator() {
        let data = gzip(b"first\r\nsecond");
        let mut source = LineSource::spawn(Cursor::new(data), 8);

        let lines = collect(&mut source).await.unwrap();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_empty_object() {
        let data = gzip(b"");
        let mut source = LineSource::spawn(Cursor::new(data), 8);

        assert!(source.next_line().await.unwrap().is_none());
        assert_eq!(source.lines_read(), 0);
    }

    #[tokio::test]
    async fn test_multi_member_gzip() {
        let mut data = gzip(b"one\n");
        data.extend(gzip(b"two\n"));
        let mut source = LineSource::spawn(Cursor::new(data), 8);

        let lines = collect(&mut source).await.unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_not_gzip_is_error() {
        let mut source = LineSource::spawn(Cursor::new(b"plain text\n".to_vec()), 8);

        let result = source.next_line().await;
        assert!(matches!(result, Err(LineSourceError::Decompression(_))));

        // Terminal event is delivered once
        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_gzip_is_error() {
        let content: String = (0..2000).map(|i| format!("line number {}\n", i)).collect();
        let mut data = gzip(content.as_bytes());
        data.truncate(data.len() / 2);
        let mut source = LineSource::spawn(Cursor::new(data), 8);

        let result = collect(&mut source).await;
        assert!(matches!(result, Err(LineSourceError::Decompression(_))));
    }

    struct ResetReader;

    impl AsyncRead for ResetReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )))
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_read_error() {
        let mut source = LineSource::spawn(ResetReader, 8);

        let result = source.next_line().await;
        assert!(matches!(result, Err(LineSourceError::StreamRead(_))));
        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overlong_line_is_error() {
        let mut content = b"short\n".to_vec();
        content.extend(std::iter::repeat(b'x').take(64));
        content.extend(b"\nnever reached\n");
        let mut source = LineSource::spawn_with_limit(Cursor::new(gzip(&content)), 8, 16);

        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("short"));
        assert!(matches!(
            source.next_line().await,
            Err(LineSourceError::LineTooLong { limit: 16 })
        ));
        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_line_at_limit_is_accepted() {
        let line = "y".repeat(16);
        let data = gzip(format!("{}\n{}", line, line).as_bytes());
        let mut source = LineSource::spawn_with_limit(Cursor::new(data), 8, 16);

        let lines = collect(&mut source).await.unwrap();
        assert_eq!(lines, vec![line.clone(), line]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let data = gzip(b"caf\xff\n");
        let mut source = LineSource::spawn(Cursor::new(data), 8);

        let line = source.next_line().await.unwrap().unwrap();
        assert_eq!(line, "caf\u{FFFD}");
    }
}
