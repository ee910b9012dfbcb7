//! Delivering termination signals to supervised processes.
//!
//! Every command is spawned as the leader of its own process group, so a
//! signal sent to the group reaches the shell and everything it started.

use std::fmt;

use nix::sys::signal::{kill, killpg, Signal as NixSignal};
use nix::unistd::Pid;

use crate::{Error, Result};

/// Signals the registry sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Graceful termination (`SIGTERM`).
    Terminate,
    /// Forced kill (`SIGKILL`).
    Kill,
}

impl Signal {
    fn as_nix(self) -> NixSignal {
        match self {
            Signal::Terminate => NixSignal::SIGTERM,
            Signal::Kill => NixSignal::SIGKILL,
        }
    }

    /// Past-tense verb for log messages.
    pub fn outcome(self) -> &'static str {
        match self {
            Signal::Terminate => "terminated",
            Signal::Kill => "killed",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Terminate => write!(f, "SIGTERM"),
            Signal::Kill => write!(f, "SIGKILL"),
        }
    }
}

/// Send `signal` to the process group led by `pid`.
///
/// Falls back to signalling `pid` alone when the group cannot be signalled.
pub fn send(pid: u32, signal: Signal) -> Result<()> {
    // 0 would address our own process group
    let raw = i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .ok_or(Error::Signal {
            pid,
            source: nix::errno::Errno::EINVAL,
        })?;
    let target = Pid::from_raw(raw);

    match killpg(target, signal.as_nix()) {
        Ok(()) => Ok(()),
        Err(group_err) => {
            tracing::debug!(pid, %signal, error = %group_err, "group signal failed, signalling process");
            kill(target, signal.as_nix()).map_err(|source| Error::Signal { pid, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_outcome() {
        assert_eq!(Signal::Terminate.to_string(), "SIGTERM");
        assert_eq!(Signal::Kill.to_string(), "SIGKILL");
        assert_eq!(Signal::Terminate.outcome(), "terminated");
        assert_eq!(Signal::Kill.outcome(), "killed");
    }

    #[test]
    fn out_of_range_pid_is_rejected() {
        let result = send(u32::MAX, Signal::Terminate);
        assert!(matches!(result, Err(Error::Signal { .. })));
        let result = send(0, Signal::Kill);
        assert!(matches!(result, Err(Error::Signal { .. })));
    }
}
