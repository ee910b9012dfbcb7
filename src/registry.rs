//! Process registry: the host-facing control surface.
//!
//! This module provides [`ProcessRegistry`], the main entry point for hosts.
//! It maps process ids to their [`ProcessWorker`]s and turns every failure
//! into a plain `bool`/`Option` result plus a tracing event, so nothing
//! propagates into the host's main loop.
//!
//! # Example
//!
//! ```ignore
//! use asyncshell::{CommandSpec, ProcessRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ProcessRegistry::new();
//!
//!     let pid = registry
//!         .start(CommandSpec::new("ping -c 3 localhost").print_exit_status(true))
//!         .await
//!         .expect("spawned");
//!
//!     // Poll from the host's main loop
//!     while registry.is_running(pid) || registry.has_pending_output(pid) {
//!         if let Some(out) = registry.drain_output(pid) {
//!             for line in out.lines {
//!                 println!("{line}");
//!             }
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!     }
//!
//!     registry.terminate_all().await;
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::{CommandSpec, SupervisorConfig};
use crate::output::Drained;
use crate::process::{signal, ProcessWorker, Signal, WorkerState};
use crate::{Error, Result};

/// Coarse status shown in process listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Finished,
}

/// One registry entry as shown in a process listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub pid: u32,
    pub command: String,
    pub status: ProcessStatus,
    pub exit_code: Option<i32>,
}

/// Registry of supervised processes keyed by process id.
///
/// Create one per host, pass it by reference to whatever needs it, and call
/// [`terminate_all`](Self::terminate_all) (or [`shutdown`](Self::shutdown))
/// before discarding it.
///
/// Entries are added only by [`start`](Self::start) and removed only by
/// [`delete`](Self::delete), which refuses while the worker is alive. The map
/// lock is held only around lookups, inserts and removals, never across a
/// wait.
#[derive(Debug)]
pub struct ProcessRegistry {
    config: Arc<SupervisorConfig>,
    workers: Mutex<HashMap<u32, Arc<ProcessWorker>>>,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry {
    /// Create a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SupervisorConfig::default())
    }

    /// Create a registry with the given configuration.
    pub fn with_config(config: SupervisorConfig) -> Self {
        Self {
            config: Arc::new(config),
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    fn lookup(&self, pid: u32) -> Result<Arc<ProcessWorker>> {
        self.workers
            .lock()
            .get(&pid)
            .cloned()
            .ok_or(Error::UnknownProcess(pid))
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Start a command and register it.
    ///
    /// Returns the process id, or `None` if the command could not be spawned
    /// within the configured spawn timeout.
    pub async fn start(&self, spec: impl Into<CommandSpec>) -> Option<u32> {
        let spec = spec.into();
        let command = spec.command.clone();

        let worker = match ProcessWorker::start(spec, Arc::clone(&self.config)).await {
            Ok(worker) => worker,
            Err(e) => {
                tracing::warn!(command = %command, error = %e, "shell command did not start");
                return None;
            }
        };

        let pid = worker.pid()?;
        self.workers.lock().insert(pid, worker);
        tracing::info!(pid, command = %command, "shell command started");
        Some(pid)
    }

    /// Start a command in a slot previously occupied by `previous`.
    ///
    /// One slot runs one command at a time: the previous process is
    /// terminated and deleted first. If it resists termination its entry is
    /// kept and reported as still running; the new command starts anyway.
    pub async fn replace(&self, previous: Option<u32>, spec: impl Into<CommandSpec>) -> Option<u32> {
        if let Some(previous) = previous {
            self.terminate(previous).await;
            self.delete(previous);
        }
        self.start(spec).await
    }

    /// Gracefully terminate the process group of `pid`.
    ///
    /// Returns `true` once the worker has finished (immediately, without
    /// signalling, if it already had) and `false` if it is still running
    /// after the signal timeout.
    pub async fn terminate(&self, pid: u32) -> bool {
        self.stop(pid, Signal::Terminate).await
    }

    /// Forcefully kill the process group of `pid`.
    ///
    /// Same result semantics as [`terminate`](Self::terminate).
    pub async fn kill(&self, pid: u32) -> bool {
        self.stop(pid, Signal::Kill).await
    }

    async fn stop(&self, pid: u32, signal: Signal) -> bool {
        match self.signal_and_wait(pid, signal).await {
            Ok(()) => true,
            Err(Error::UnknownProcess(_)) => {
                tracing::debug!(pid, %signal, "no such shell command, nothing to signal");
                true
            }
            Err(_) => false,
        }
    }

    async fn signal_and_wait(&self, pid: u32, signal: Signal) -> Result<()> {
        let worker = self.lookup(pid)?;
        if !worker.is_alive() {
            tracing::info!(pid, command = worker.command(), "shell command is finished");
            return Ok(());
        }

        if let Err(e) = signal::send(pid, signal) {
            // The process may have exited between the check and the signal.
            tracing::debug!(pid, error = %e, "signal not delivered");
        }

        let waited = self.config.signal_timeout;
        if worker.wait_finished(waited).await {
            tracing::info!(pid, command = worker.command(), "shell command {}", signal.outcome());
            Ok(())
        } else {
            tracing::warn!(pid, command = worker.command(), "shell command is still running");
            Err(Error::StillRunning { pid, waited })
        }
    }

    /// Remove a finished process from the registry.
    ///
    /// Returns `false`, leaving the entry in place, while the worker is
    /// alive. Unknown ids are a no-op returning `true`.
    pub fn delete(&self, pid: u32) -> bool {
        let mut workers = self.workers.lock();
        let Some(worker) = workers.get(&pid) else {
            return true;
        };
        if worker.is_alive() {
            tracing::warn!(pid, command = worker.command(), "shell command is still running");
            return false;
        }
        if let Some(worker) = workers.remove(&pid) {
            tracing::info!(pid, command = worker.command(), "shell command deleted");
        }
        true
    }

    /// Terminate every process; kill those that resist termination.
    pub async fn terminate_all(&self) {
        let pids: Vec<u32> = self.workers.lock().keys().copied().collect();
        futures::future::join_all(pids.into_iter().map(|pid| async move {
            if !self.terminate(pid).await {
                self.kill(pid).await;
            }
        }))
        .await;
    }

    /// Terminate everything and discard the registry.
    pub async fn shutdown(self) {
        self.terminate_all().await;
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Whether `pid` is registered.
    pub fn contains(&self, pid: u32) -> bool {
        self.workers.lock().contains_key(&pid)
    }

    /// Whether `pid` is registered and has not exited.
    pub fn is_running(&self, pid: u32) -> bool {
        self.lookup(pid).map(|w| w.is_running()).unwrap_or(false)
    }

    /// Commands of all live workers, keyed by process id.
    pub fn list_running(&self) -> HashMap<u32, String> {
        self.workers
            .lock()
            .iter()
            .filter(|(_, worker)| worker.is_alive())
            .map(|(pid, worker)| (*pid, worker.command().to_string()))
            .collect()
    }

    /// Every registered process, ordered by process id.
    pub fn list(&self) -> Vec<ProcessSummary> {
        let mut summaries: Vec<ProcessSummary> = self
            .workers
            .lock()
            .iter()
            .map(|(pid, worker)| ProcessSummary {
                pid: *pid,
                command: worker.command().to_string(),
                status: if worker.is_alive() {
                    ProcessStatus::Running
                } else {
                    ProcessStatus::Finished
                },
                exit_code: worker.exit_code(),
            })
            .collect();
        summaries.sort_by_key(|s| s.pid);
        summaries
    }

    /// Command text of `pid`.
    pub fn command(&self, pid: u32) -> Option<String> {
        self.lookup(pid).ok().map(|w| w.command().to_string())
    }

    /// Lifecycle state of `pid`.
    pub fn state(&self, pid: u32) -> Option<WorkerState> {
        self.lookup(pid).ok().map(|w| w.state())
    }

    /// Exit code of `pid`, once it has exited.
    pub fn exit_code(&self, pid: u32) -> Option<i32> {
        self.lookup(pid).ok().and_then(|w| w.exit_code())
    }

    /// Whether `pid` is idle with no input queued.
    pub fn is_waiting_for_input(&self, pid: u32) -> bool {
        self.lookup(pid)
            .map(|w| w.is_waiting_for_input())
            .unwrap_or(false)
    }

    /// The pending partial line of `pid` while it waits for input.
    pub fn remainder_if_waiting(&self, pid: u32) -> String {
        self.lookup(pid)
            .map(|w| w.remainder_if_waiting())
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    /// Take everything buffered for `pid`.
    pub fn drain_output(&self, pid: u32) -> Option<Drained> {
        self.lookup(pid).ok().and_then(|w| w.drain_output())
    }

    /// Whether a drain of `pid` would return anything.
    pub fn has_pending_output(&self, pid: u32) -> bool {
        self.lookup(pid)
            .map(|w| w.has_pending_output())
            .unwrap_or(false)
    }

    /// Whether `pid` produced complete lines since its last drain.
    pub fn has_new_output(&self, pid: u32) -> bool {
        self.lookup(pid)
            .map(|w| w.has_new_output())
            .unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    fn live_worker(&self, pid: u32) -> Option<Arc<ProcessWorker>> {
        let worker = self.lookup(pid).ok()?;
        if !worker.is_alive() {
            tracing::info!(pid, command = worker.command(), "shell command is finished");
            return None;
        }
        Some(worker)
    }

    /// Queue input for `pid`, optionally followed by a newline.
    ///
    /// Returns `false` if `pid` is unknown or already finished.
    pub fn send_input(&self, pid: u32, text: &str, append_newline: bool) -> bool {
        let Some(worker) = self.live_worker(pid) else {
            return false;
        };
        if append_newline {
            worker.write(text);
        } else {
            worker.write_raw(text);
        }
        true
    }

    /// Queue several input entries for `pid`, in order.
    pub fn send_lines<I>(&self, pid: u32, lines: I, append_newline: bool) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let Some(worker) = self.live_worker(pid) else {
            return false;
        };
        if append_newline {
            worker.write_lines(lines);
        } else {
            worker.write_lines_raw(lines);
        }
        true
    }

    /// Close stdin of `pid` once its queued input is written.
    pub fn close_input(&self, pid: u32) -> bool {
        let Some(worker) = self.live_worker(pid) else {
            return false;
        };
        worker.close_input();
        true
    }
}
