use std::time::Duration;

/// Errors that can occur inside asyncshell.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time
/// - Spawn errors: the subprocess never became observable
/// - Control errors: a lifecycle operation could not complete
/// - IO errors: communication failures with the subprocess
///
/// The [`ProcessRegistry`](crate::ProcessRegistry) resolves these into plain
/// `bool`/`Option` results at its boundary; they are exposed for callers that
/// drive a [`ProcessWorker`](crate::ProcessWorker) directly.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors (detected at build() time)
    // -------------------------------------------------------------------------
    /// Invalid configuration provided to a builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // Spawn errors
    // -------------------------------------------------------------------------
    /// Failed to spawn the shell subprocess.
    #[error("failed to spawn shell process: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    /// The subprocess id did not become observable in time.
    #[error("process id not observed within {0:?}")]
    SpawnTimeout(Duration),

    // -------------------------------------------------------------------------
    // Control errors
    // -------------------------------------------------------------------------
    /// No worker is registered under this process id.
    #[error("unknown process id {0}")]
    UnknownProcess(u32),

    /// The process was signalled but did not finish in time.
    #[error("process {pid} is still running after {waited:?}")]
    StillRunning { pid: u32, waited: Duration },

    /// Delivering a signal failed for both the process group and the process.
    #[error("failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    // -------------------------------------------------------------------------
    // IO errors
    // -------------------------------------------------------------------------
    /// IO error communicating with the subprocess.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
}

/// A specialized Result type for asyncshell operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error means the subprocess was never started.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Error::ProcessSpawn(_) | Error::SpawnTimeout(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Whether an I/O error only means "no progress this time".
///
/// Such conditions are absorbed by the worker loop and retried on the next
/// iteration instead of being reported.
pub(crate) fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }

    #[test]
    fn spawn_failure_detection() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        assert!(Error::ProcessSpawn(io_err).is_spawn_failure());
        assert!(Error::SpawnTimeout(Duration::from_secs(1)).is_spawn_failure());
        assert!(!Error::UnknownProcess(42).is_spawn_failure());
        assert!(!Error::StillRunning {
            pid: 42,
            waited: Duration::from_secs(15)
        }
        .is_spawn_failure());
    }

    #[test]
    fn transient_kinds() {
        use std::io::{Error as IoError, ErrorKind};
        assert!(is_transient(&IoError::from(ErrorKind::WouldBlock)));
        assert!(is_transient(&IoError::from(ErrorKind::Interrupted)));
        assert!(!is_transient(&IoError::from(ErrorKind::BrokenPipe)));
        assert!(!is_transient(&IoError::from(ErrorKind::NotFound)));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn question_mark_operator_io() {
        fn fallible_io() -> Result<()> {
            let _file = std::fs::File::open("/nonexistent/path/that/does/not/exist")?;
            Ok(())
        }
        assert!(matches!(fallible_io(), Err(Error::Io(_))));
    }

    #[test]
    fn display_messages() {
        let err = Error::StillRunning {
            pid: 7,
            waited: Duration::from_secs(15),
        };
        assert_eq!(err.to_string(), "process 7 is still running after 15s");
        assert_eq!(Error::UnknownProcess(9).to_string(), "unknown process id 9");
    }
}
