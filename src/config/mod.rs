//! Configuration for the supervisor and for individual commands.
//!
//! This module provides:
//!
//! - [`SupervisorConfig`] and [`SupervisorConfigBuilder`] for registry-wide
//!   tunables (shell, poll cadence, timeouts, exit status reporting)
//! - [`CommandSpec`] describing one command invocation
//!
//! # Example
//!
//! ```ignore
//! use asyncshell::config::{CommandSpec, SupervisorConfig};
//!
//! let config = SupervisorConfig::builder()
//!     .print_exit_status(true)
//!     .build()?;
//!
//! let spec = CommandSpec::new("cargo build")
//!     .working_dir("/src/project")
//!     .env("CARGO_TERM_COLOR", "never");
//! ```

pub mod builder;
pub mod options;

pub use builder::{SupervisorConfig, SupervisorConfigBuilder};
pub use options::CommandSpec;
