//! Test utilities for asyncshell integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use asyncshell::{Drained, ProcessRegistry, SupervisorConfig};

/// Upper bound for any single condition a test waits on.
pub const WAIT_LIMIT: Duration = Duration::from_secs(10);

/// A registry with a quick poll cadence and a short signal timeout.
pub fn fast_registry() -> ProcessRegistry {
    ProcessRegistry::with_config(fast_config().build().expect("valid config"))
}

/// Builder preset used by [`fast_registry`], for tests that tweak it further.
pub fn fast_config() -> asyncshell::SupervisorConfigBuilder {
    SupervisorConfig::builder()
        .poll_interval(Duration::from_millis(10))
        .idle_interval(Duration::from_millis(2))
        .signal_timeout(Duration::from_secs(2))
}

/// Poll `condition` every few milliseconds until it holds or `limit` passes.
///
/// Returns whether the condition held.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Same as [`wait_until`] for an async condition.
pub async fn wait_until_async<F, Fut>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Accumulates drained output the way a simple consumer would.
///
/// Complete lines are appended; a remainder is shown in place and replaced
/// when the next drain reports it changed.
#[derive(Debug, Default)]
pub struct Transcript {
    pub lines: Vec<String>,
    showing_remainder: bool,
    pub drains: Vec<Drained>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain `pid` once and fold the result in. Returns whether anything came.
    pub fn pull(&mut self, registry: &ProcessRegistry, pid: u32) -> bool {
        let Some(drained) = registry.drain_output(pid) else {
            return false;
        };
        if self.showing_remainder && (drained.remainder_changed || drained.remainder_active) {
            self.lines.pop();
        }
        self.showing_remainder = drained.remainder_active;
        self.lines.extend(drained.lines.iter().cloned());
        self.drains.push(drained);
        true
    }

    /// Whether any line shown so far equals `line`.
    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }
}

/// Wait for `pid` to finish and return every line it produced.
pub async fn collect_all(registry: &ProcessRegistry, pid: u32) -> Vec<String> {
    let mut transcript = Transcript::new();
    let finished = wait_until(WAIT_LIMIT, || {
        transcript.pull(registry, pid);
        !registry.list_running().contains_key(&pid)
    })
    .await;
    assert!(finished, "process {pid} did not finish in time");
    while transcript.pull(registry, pid) {}
    transcript.lines
}
