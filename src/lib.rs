//! # asyncshell
//!
//! Run shell commands in the background and talk to them from a host's main
//! loop without ever blocking it.
//!
//! This library provides:
//! - Non-blocking capture of a command's combined stdout/stderr
//! - Line framing across arbitrary read boundaries, with a live view of the
//!   unterminated last line (prompts)
//! - Queued interactive input, including end-of-input
//! - Process-group termination, forced kill and registry bookkeeping keyed by
//!   process id
//!
//! ## Quick Start
//!
//! ```ignore
//! use asyncshell::{CommandSpec, ProcessRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ProcessRegistry::new();
//!     let pid = registry.start("printf 'a\\nb\\nc'").await.expect("spawned");
//!
//!     // ... later, from the host's polling loop
//!     if let Some(out) = registry.drain_output(pid) {
//!         assert_eq!(out.lines, ["a", "b", "c"]);
//!     }
//! }
//! ```
//!
//! ## Interactive input
//!
//! ```ignore
//! let pid = registry.start("read name; echo hello $name").await.expect("spawned");
//! registry.send_input(pid, "world", true);
//! ```
//!
//! ## Prompts
//!
//! When a command prints a line without a trailing newline and then waits,
//! [`ProcessRegistry::drain_output`] returns it with `remainder_active` set.
//! Once more output completes or replaces that line, the next drain reports
//! `remainder_changed` so the consumer can overwrite what it showed.
//!
//! ## Configuration
//!
//! ```ignore
//! use std::time::Duration;
//! use asyncshell::{ProcessRegistry, SupervisorConfig};
//!
//! let config = SupervisorConfig::builder()
//!     .print_exit_status(true)
//!     .signal_timeout(Duration::from_secs(5))
//!     .build()?;
//! let registry = ProcessRegistry::with_config(config);
//! ```

pub mod config;
mod error;
pub mod output;
pub mod process;
mod registry;

pub use error::{Error, Result};

// Re-export the main registry types at crate root
pub use registry::{ProcessRegistry, ProcessStatus, ProcessSummary};

// Re-export commonly used config types at crate root
pub use config::{CommandSpec, SupervisorConfig, SupervisorConfigBuilder};

// Re-export commonly used output types at crate root
pub use output::{strip_ansi, Drained, LineFramer, OutputBuffer};

// Re-export commonly used process types at crate root
pub use process::{PendingInput, ProcessWorker, Signal, WorkerState};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    /// All major public types must be Send + Sync for use across tasks.
    #[test]
    fn public_types_are_send_sync() {
        // Registry types
        assert_send_sync::<ProcessRegistry>();
        assert_send_sync::<ProcessSummary>();
        assert_send_sync::<ProcessStatus>();

        // Configuration types
        assert_send_sync::<SupervisorConfig>();
        assert_send_sync::<SupervisorConfigBuilder>();
        assert_send_sync::<CommandSpec>();

        // Output types
        assert_send_sync::<OutputBuffer>();
        assert_send_sync::<Drained>();
        assert_send_sync::<LineFramer>();

        // Process types
        assert_send_sync::<ProcessWorker>();
        assert_send_sync::<WorkerState>();
        assert_send_sync::<PendingInput>();
        assert_send_sync::<Signal>();

        // Error type
        assert_send_sync::<Error>();
    }
}
