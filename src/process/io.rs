//! I/O primitives for the subprocess pipes.
//!
//! Both sides are driven with bounded waits so the worker loop never blocks on
//! one pipe while the other needs attention. Reads and writes on tokio pipes
//! are cancel-safe: a wait that times out transfers no data.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::time::timeout;

use crate::error::is_transient;

/// Result of one bounded read from the output pipe.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome<'a> {
    /// Bytes read in this attempt.
    Data(&'a [u8]),
    /// Nothing arrived within the wait, or the read was interrupted.
    Idle,
    /// The pipe reached end-of-file or failed; no further reads happen.
    Closed,
}

/// Reads raw chunks from the subprocess combined output.
pub struct OutputReader {
    stdout: Option<ChildStdout>,
    buffer: Vec<u8>,
}

impl OutputReader {
    /// Create a reader over `stdout` reading at most `buffer_size` bytes at once.
    pub fn new(stdout: Option<ChildStdout>, buffer_size: usize) -> Self {
        Self {
            stdout,
            buffer: vec![0; buffer_size.max(1)],
        }
    }

    /// Whether the pipe is still open.
    pub fn is_open(&self) -> bool {
        self.stdout.is_some()
    }

    /// Wait up to `wait` for output and return what is available.
    pub async fn read_chunk(&mut self, wait: Duration) -> ReadOutcome<'_> {
        let Some(stdout) = self.stdout.as_mut() else {
            return ReadOutcome::Closed;
        };

        match timeout(wait, stdout.read(&mut self.buffer)).await {
            Err(_elapsed) => ReadOutcome::Idle,
            Ok(Ok(0)) => {
                tracing::trace!("output pipe reached end of file");
                self.stdout = None;
                ReadOutcome::Closed
            }
            Ok(Ok(n)) => ReadOutcome::Data(&self.buffer[..n]),
            Ok(Err(e)) if is_transient(&e) => ReadOutcome::Idle,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "output pipe failed, closing");
                self.stdout = None;
                ReadOutcome::Closed
            }
        }
    }
}

/// Writes queued input into the subprocess stdin.
///
/// One entry is in flight at a time. An entry that does not fit into the pipe
/// within one wait is resumed on the next call, so a subprocess that stops
/// reading never stalls the output side.
pub struct InputWriter {
    stdin: Option<ChildStdin>,
    pending: Vec<u8>,
    written: usize,
}

impl InputWriter {
    /// Create a writer over `stdin`.
    pub fn new(stdin: Option<ChildStdin>) -> Self {
        Self {
            stdin,
            pending: Vec::new(),
            written: 0,
        }
    }

    /// Whether the pipe is still open.
    pub fn is_open(&self) -> bool {
        self.stdin.is_some()
    }

    /// Whether an entry is still partially unwritten.
    pub fn is_busy(&self) -> bool {
        self.written < self.pending.len()
    }

    /// Stage `text` as the next entry to write.
    pub fn offer(&mut self, text: &str) {
        debug_assert!(!self.is_busy(), "previous entry still in flight");
        self.pending.clear();
        self.pending.extend_from_slice(text.as_bytes());
        self.written = 0;
    }

    /// Close stdin, signalling end-of-input to the subprocess.
    pub fn close(&mut self) {
        if self.stdin.take().is_some() {
            tracing::trace!("closed input pipe");
        }
        self.pending.clear();
        self.written = 0;
    }

    /// Write as much of the staged entry as the pipe accepts within `wait`.
    pub async fn write_pending(&mut self, wait: Duration) {
        let Some(stdin) = self.stdin.as_mut() else {
            self.pending.clear();
            self.written = 0;
            return;
        };

        while self.written < self.pending.len() {
            match timeout(wait, stdin.write(&self.pending[self.written..])).await {
                // Pipe full; resume next iteration
                Err(_elapsed) => return,
                Ok(Ok(0)) => {
                    self.close();
                    return;
                }
                Ok(Ok(n)) => self.written += n,
                Ok(Err(e)) if is_transient(&e) => return,
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "input pipe failed, closing");
                    self.close();
                    return;
                }
            }
        }

        if let Ok(Err(e)) = timeout(wait, stdin.flush()).await {
            tracing::debug!(error = %e, "flushing input pipe failed");
        }
        self.pending.clear();
        self.written = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OutputReader>();
        assert_send_sync::<InputWriter>();
    }

    #[tokio::test]
    async fn detached_reader_is_closed() {
        let mut reader = OutputReader::new(None, 16);
        assert!(!reader.is_open());
        assert_eq!(
            reader.read_chunk(Duration::from_millis(1)).await,
            ReadOutcome::Closed
        );
    }

    #[tokio::test]
    async fn detached_writer_drops_pending() {
        let mut writer = InputWriter::new(None);
        writer.offer("hello\n");
        assert!(writer.is_busy());
        writer.write_pending(Duration::from_millis(1)).await;
        assert!(!writer.is_busy());
        assert!(!writer.is_open());
    }
}
