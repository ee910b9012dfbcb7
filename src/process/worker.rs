//! The per-process worker: one subprocess, one tokio task.
//!
//! The task multiplexes the subprocess pipes. Each iteration it waits a
//! bounded time for output, frames whatever arrived, moves at most one queued
//! input entry toward stdin when there was no output, and checks for exit only
//! when nothing at all happened.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::process::Child;
use tokio::sync::{oneshot, watch};
use tokio::time::{sleep, timeout, Instant};

use super::input::{InputQueue, PendingInput};
use super::io::{InputWriter, OutputReader, ReadOutcome};
use super::signal::{self, Signal};
use super::spawn;
use crate::config::{CommandSpec, SupervisorConfig};
use crate::output::{Drained, Framed, LineFramer, OutputBuffer};
use crate::{Error, Result};

/// Lifecycle of a worker.
///
/// `Starting -> Running -> AwaitingInput <-> Running -> Exited(code)`, or
/// `Starting -> SpawnFailed` when the subprocess never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "code", rename_all = "snake_case")]
pub enum WorkerState {
    /// The task has not reported a process id yet.
    Starting,
    /// The last iteration produced output or delivered input.
    Running,
    /// Idle: no new output and no input to deliver, or a partial line is
    /// waiting to be completed.
    AwaitingInput,
    /// The subprocess exited with this code (`-signal` if killed by a signal).
    Exited(i32),
    /// The subprocess could not be started.
    SpawnFailed,
}

impl WorkerState {
    /// Exit code, once exited.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            WorkerState::Exited(code) => Some(*code),
            _ => None,
        }
    }

    /// Whether the subprocess may still be running.
    pub fn is_running(&self) -> bool {
        !matches!(self, WorkerState::Exited(_) | WorkerState::SpawnFailed)
    }
}

#[derive(Debug)]
struct Status {
    state: WorkerState,
    pid: Option<u32>,
    /// The starter stopped waiting; nobody will supervise the process.
    abandoned: bool,
}

/// Supervisor of a single shell command.
///
/// Created with [`ProcessWorker::start`], which spawns the background task.
/// All accessors take a short lock and return immediately; only
/// [`wait_finished`](Self::wait_finished) waits, and only up to its limit.
///
/// # Thread Safety
///
/// `ProcessWorker` is `Send + Sync`. The task is the only producer of output
/// and the only consumer of input; any number of callers may drain output and
/// queue input concurrently.
#[derive(Debug)]
pub struct ProcessWorker {
    command: String,
    print_exit_status: bool,
    status: Mutex<Status>,
    output: OutputBuffer,
    input: InputQueue,
    finished: watch::Sender<bool>,
}

impl ProcessWorker {
    fn new(command: String, print_exit_status: bool) -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            command,
            print_exit_status,
            status: Mutex::new(Status {
                state: WorkerState::Starting,
                pid: None,
                abandoned: false,
            }),
            output: OutputBuffer::new(),
            input: InputQueue::new(),
            finished,
        }
    }

    /// Spawn `spec` and start supervising it.
    ///
    /// Waits at most [`SupervisorConfig::spawn_timeout`] for the process id
    /// to become observable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessSpawn`] if the shell could not be started and
    /// [`Error::SpawnTimeout`] if no process id appeared in time.
    pub async fn start(spec: CommandSpec, config: Arc<SupervisorConfig>) -> Result<Arc<Self>> {
        let print_exit_status = spec.print_exit_status.unwrap_or(config.print_exit_status);
        let worker = Arc::new(Self::new(spec.command.clone(), print_exit_status));
        let spawn_timeout = config.spawn_timeout;

        let (ready_tx, ready_rx) = oneshot::channel();
        let task = Arc::clone(&worker);
        tokio::spawn(async move { task.run(spec, config, ready_tx).await });

        match timeout(spawn_timeout, ready_rx).await {
            Ok(Ok(Ok(pid))) => {
                tracing::debug!(pid, command = %worker.command, "spawned command");
                Ok(worker)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(Error::ProcessSpawn(std::io::Error::other(
                "worker task ended before reporting a process id",
            ))),
            Err(_) => {
                // A process spawned after this point is killed by the task.
                if let Some(pid) = worker.abandon() {
                    tracing::warn!(pid, command = %worker.command, "spawn timed out, killing process");
                    if let Err(e) = signal::send(pid, Signal::Kill) {
                        tracing::debug!(pid, error = %e, "signal not delivered");
                    }
                }
                Err(Error::SpawnTimeout(spawn_timeout))
            }
        }
    }

    /// Mark the worker as unsupervised.
    ///
    /// Returns the process id to kill if this call is the first to abandon
    /// the worker and the process is already known.
    fn abandon(&self) -> Option<u32> {
        let mut status = self.status.lock();
        if std::mem::replace(&mut status.abandoned, true) {
            return None;
        }
        status.pid
    }

    // -------------------------------------------------------------------------
    // Background task
    // -------------------------------------------------------------------------

    async fn run(
        self: Arc<Self>,
        spec: CommandSpec,
        config: Arc<SupervisorConfig>,
        ready: oneshot::Sender<Result<u32>>,
    ) {
        let mut child = match spawn::spawn(&config, &spec) {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(command = %self.command, error = %e, "failed to spawn command");
                self.fail_spawn();
                let _ = ready.send(Err(e));
                return;
            }
        };

        let Some(pid) = child.id() else {
            self.fail_spawn();
            let _ = ready.send(Err(Error::ProcessSpawn(std::io::Error::other(
                "process exited before its id was observed",
            ))));
            return;
        };

        let abandoned = {
            let mut status = self.status.lock();
            status.pid = Some(pid);
            status.state = WorkerState::Running;
            status.abandoned
        };
        // A failed send means the starter gave up; whoever abandons first kills.
        let orphaned = abandoned || (ready.send(Ok(pid)).is_err() && self.abandon().is_some());
        if orphaned {
            self.discard(&mut child, pid).await;
            return;
        }

        let mut reader = OutputReader::new(child.stdout.take(), config.read_buffer_size);
        let mut writer = InputWriter::new(child.stdin.take());
        let mut framer = LineFramer::new();

        let code = self
            .pump(&mut child, &mut reader, &mut writer, &mut framer, &config)
            .await;

        self.drain_remaining(&mut reader, &mut framer, config.poll_interval)
            .await;

        let mut tail: Vec<String> = framer.finish().into_iter().collect();
        if self.print_exit_status {
            tail.push(String::new());
            tail.push(format!(
                "Shell command {} completed with exit status {}",
                self.command, code
            ));
        }
        if !tail.is_empty() {
            self.output.append_lines(tail);
        }

        tracing::info!(pid, command = %self.command, code, "command finished");
        self.finished.send_replace(true);
    }

    /// Multiplex the pipes until the subprocess exits; returns its exit code.
    async fn pump(
        &self,
        child: &mut Child,
        reader: &mut OutputReader,
        writer: &mut InputWriter,
        framer: &mut LineFramer,
        config: &SupervisorConfig,
    ) -> i32 {
        loop {
            let mut framed = match reader.read_chunk(config.poll_interval).await {
                ReadOutcome::Data(bytes) => Some(framer.push(bytes)),
                ReadOutcome::Idle | ReadOutcome::Closed => None,
            };

            if framed.is_none() {
                if let Some(echo) = self.feed_input(writer, config.poll_interval).await {
                    framed = Some(framer.push(echo.as_bytes()));
                }
            }

            if let Some(framed) = framed {
                let state = if self.publish(framed) {
                    WorkerState::AwaitingInput
                } else {
                    WorkerState::Running
                };
                self.set_state(state);
                continue;
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    let code = exit_code(status);
                    self.set_state(WorkerState::Exited(code));
                    return code;
                }
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "polling process status failed"),
            }

            // Re-offer the pending partial line; a consumer may have drained it.
            if let Some(remainder) = framer.remainder() {
                self.output.set_remainder(&remainder);
            }
            self.set_state(WorkerState::AwaitingInput);

            if !reader.is_open() {
                sleep(config.idle_interval).await;
            }
        }
    }

    /// Move at most one queued entry toward stdin. Returns text to echo.
    async fn feed_input(&self, writer: &mut InputWriter, wait: Duration) -> Option<String> {
        let mut echo = None;
        if !writer.is_busy() {
            match self.input.pop() {
                Some(PendingInput::EndOfInput) => writer.close(),
                Some(PendingInput::Text(text)) if writer.is_open() => {
                    writer.offer(&text);
                    echo = Some(text);
                }
                Some(PendingInput::Text(text)) => {
                    tracing::debug!(bytes = text.len(), "input pipe closed, dropping input");
                }
                None => {}
            }
        }
        if writer.is_busy() {
            writer.write_pending(wait).await;
        }
        echo
    }

    /// Hand framed output to the buffer. Returns whether a remainder is pending.
    fn publish(&self, framed: Framed) -> bool {
        if !framed.lines.is_empty() {
            self.output.append_lines(framed.lines);
        }
        match framed.remainder {
            Some(remainder) => {
                self.output.set_remainder(&remainder);
                true
            }
            None => false,
        }
    }

    /// Collect output still buffered in the pipe after exit.
    async fn drain_remaining(
        &self,
        reader: &mut OutputReader,
        framer: &mut LineFramer,
        wait: Duration,
    ) {
        // Bounded: a surviving background job may keep the pipe open and busy.
        let deadline = Instant::now() + wait * 2;
        while Instant::now() < deadline {
            match reader.read_chunk(wait).await {
                ReadOutcome::Data(bytes) => {
                    let framed = framer.push(bytes);
                    if !framed.lines.is_empty() {
                        self.output.append_lines(framed.lines);
                    }
                }
                ReadOutcome::Idle | ReadOutcome::Closed => break,
            }
        }
    }

    /// Kill and reap a process nobody is waiting for.
    async fn discard(&self, child: &mut Child, pid: u32) {
        tracing::warn!(pid, command = %self.command, "spawn was abandoned, killing process");
        if let Err(e) = signal::send(pid, Signal::Kill) {
            tracing::debug!(pid, error = %e, "signal not delivered");
        }
        let code = match child.wait().await {
            Ok(status) => exit_code(status),
            Err(e) => {
                tracing::debug!(pid, error = %e, "reaping abandoned process failed");
                -1
            }
        };
        self.set_state(WorkerState::Exited(code));
        self.finished.send_replace(true);
    }

    fn set_state(&self, state: WorkerState) {
        self.status.lock().state = state;
    }

    fn fail_spawn(&self) {
        self.set_state(WorkerState::SpawnFailed);
        self.finished.send_replace(true);
    }

    // -------------------------------------------------------------------------
    // Status accessors
    // -------------------------------------------------------------------------

    /// The command text as given.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Process id of the shell, once spawned.
    pub fn pid(&self) -> Option<u32> {
        self.status.lock().pid
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.status.lock().state
    }

    /// Exit code, once the subprocess has exited.
    pub fn exit_code(&self) -> Option<i32> {
        self.state().exit_code()
    }

    /// Whether the background task is still working.
    ///
    /// Stays true briefly after exit while the last output is flushed.
    pub fn is_alive(&self) -> bool {
        !*self.finished.borrow()
    }

    /// Whether the subprocess has not exited yet.
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Whether the worker is idle with no input queued.
    pub fn is_waiting_for_input(&self) -> bool {
        self.input.is_empty() && self.state() == WorkerState::AwaitingInput
    }

    /// The pending partial line while waiting for input, else empty.
    ///
    /// Lets a consumer re-show a prompt after it redraws.
    pub fn remainder_if_waiting(&self) -> String {
        if self.state() == WorkerState::AwaitingInput {
            self.output.remainder()
        } else {
            String::new()
        }
    }

    /// Wait up to `limit` for the background task to finish.
    ///
    /// Returns whether the worker is finished.
    pub async fn wait_finished(&self, limit: Duration) -> bool {
        let mut finished = self.finished.subscribe();
        let _ = timeout(limit, async {
            while !*finished.borrow_and_update() {
                if finished.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;
        !self.is_alive()
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    /// Take everything buffered. See [`OutputBuffer::drain`].
    pub fn drain_output(&self) -> Option<Drained> {
        self.output.drain()
    }

    /// Whether a drain would return anything.
    pub fn has_pending_output(&self) -> bool {
        self.output.has_pending()
    }

    /// Whether complete lines arrived since the last drain.
    pub fn has_new_output(&self) -> bool {
        self.output.has_new_data()
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    /// Queue `text` followed by a newline.
    pub fn write(&self, text: &str) {
        self.input.push(format!("{text}\n"));
    }

    /// Queue `text` verbatim. A lone `"\u{4}"` closes stdin.
    pub fn write_raw(&self, text: &str) {
        self.input.push(text);
    }

    /// Queue each line followed by a newline, one entry per line.
    pub fn write_lines<I>(&self, lines: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.input
            .extend(lines.into_iter().map(|line| format!("{}\n", line.as_ref())));
    }

    /// Queue each entry verbatim, one entry per item.
    pub fn write_lines_raw<I>(&self, entries: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.input
            .extend(entries.into_iter().map(|entry| entry.as_ref().to_string()));
    }

    /// Queue end-of-input: stdin is closed once earlier entries are written.
    pub fn close_input(&self) {
        self.input.push(PendingInput::EndOfInput);
    }

    /// Number of input entries not yet handed to the subprocess.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
