//! Supervisor configuration and builder.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use asyncshell::config::SupervisorConfig;
//!
//! let config = SupervisorConfig::builder()
//!     .shell("/bin/bash")
//!     .signal_timeout(Duration::from_secs(5))
//!     .print_exit_status(true)
//!     .build()?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Shell used to run commands when none is configured.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// How long one readiness wait on the output pipe lasts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Sleep between exit checks once the output pipe is closed.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(10);

/// Bounded wait for a freshly spawned process id (roughly 1000 x 1ms).
pub const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Bounded wait for a signalled process to finish.
pub const DEFAULT_SIGNAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Size of a single read from the output pipe.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Configuration shared by every worker of a registry.
///
/// Use [`SupervisorConfig::builder()`] to create a new configuration, or
/// [`SupervisorConfig::default()`] for the stock values.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub(crate) shell: PathBuf,
    pub(crate) poll_interval: Duration,
    pub(crate) idle_interval: Duration,
    pub(crate) spawn_timeout: Duration,
    pub(crate) signal_timeout: Duration,
    pub(crate) read_buffer_size: usize,
    pub(crate) print_exit_status: bool,
}

impl SupervisorConfig {
    /// Create a new builder for SupervisorConfig.
    pub fn builder() -> SupervisorConfigBuilder {
        SupervisorConfigBuilder::default()
    }

    /// Shell binary commands are passed to with `-c`.
    pub fn shell(&self) -> &PathBuf {
        &self.shell
    }

    /// Readiness wait on the output pipe per loop iteration.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Sleep between exit checks when there is no pipe to wait on.
    pub fn idle_interval(&self) -> Duration {
        self.idle_interval
    }

    /// Upper bound on waiting for a spawned process id.
    pub fn spawn_timeout(&self) -> Duration {
        self.spawn_timeout
    }

    /// Upper bound on waiting for a terminated or killed process to finish.
    pub fn signal_timeout(&self) -> Duration {
        self.signal_timeout
    }

    /// Bytes requested per read from the output pipe.
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// Whether commands report their exit status unless they override it.
    pub fn print_exit_status(&self) -> bool {
        self.print_exit_status
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            poll_interval: DEFAULT_POLL_INTERVAL,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
            signal_timeout: DEFAULT_SIGNAL_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            print_exit_status: false,
        }
    }
}

/// Builder for [`SupervisorConfig`].
///
/// Values are validated when [`build()`](SupervisorConfigBuilder::build) is
/// called.
#[derive(Debug, Clone, Default)]
pub struct SupervisorConfigBuilder {
    config: SupervisorConfig,
}

impl SupervisorConfigBuilder {
    /// Shell binary to run commands with (`<shell> -c <command>`).
    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.config.shell = shell.into();
        self
    }

    /// Readiness wait on the output pipe per loop iteration.
    ///
    /// Shorter values lower input latency at the cost of more wakeups.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Sleep between exit checks once the output pipe has closed.
    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.config.idle_interval = interval;
        self
    }

    /// Upper bound on waiting for a spawned process id.
    pub fn spawn_timeout(mut self, timeout: Duration) -> Self {
        self.config.spawn_timeout = timeout;
        self
    }

    /// Upper bound on waiting for a signalled process to finish.
    pub fn signal_timeout(mut self, timeout: Duration) -> Self {
        self.config.signal_timeout = timeout;
        self
    }

    /// Bytes requested per read from the output pipe.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Append a completion line with the exit status when a command ends.
    pub fn print_exit_status(mut self, enabled: bool) -> Self {
        self.config.print_exit_status = enabled;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the shell path is empty, an
    /// interval or timeout is zero, or the read buffer size is zero.
    pub fn build(self) -> Result<SupervisorConfig> {
        let config = self.config;

        if config.shell.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("shell path must not be empty".into()));
        }

        for (name, value) in [
            ("poll_interval", config.poll_interval),
            ("idle_interval", config.idle_interval),
            ("spawn_timeout", config.spawn_timeout),
            ("signal_timeout", config.signal_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::InvalidConfig(format!("{name} must be non-zero")));
            }
        }

        if config.read_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "read_buffer_size must be at least 1 byte".into(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SupervisorConfig::builder().build().unwrap();
        assert_eq!(config.shell(), &PathBuf::from("/bin/sh"));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.spawn_timeout(), Duration::from_secs(1));
        assert_eq!(config.signal_timeout(), Duration::from_secs(15));
        assert!(!config.print_exit_status());
    }

    #[test]
    fn overrides() {
        let config = SupervisorConfig::builder()
            .shell("/bin/bash")
            .poll_interval(Duration::from_millis(5))
            .signal_timeout(Duration::from_secs(2))
            .read_buffer_size(16)
            .print_exit_status(true)
            .build()
            .unwrap();

        assert_eq!(config.shell(), &PathBuf::from("/bin/bash"));
        assert_eq!(config.poll_interval(), Duration::from_millis(5));
        assert_eq!(config.signal_timeout(), Duration::from_secs(2));
        assert_eq!(config.read_buffer_size(), 16);
        assert!(config.print_exit_status());
    }

    #[test]
    fn rejects_empty_shell() {
        let result = SupervisorConfig::builder().shell("").build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_durations() {
        let result = SupervisorConfig::builder()
            .poll_interval(Duration::ZERO)
            .build();
        match result {
            Err(Error::InvalidConfig(msg)) => assert!(msg.contains("poll_interval")),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }

        let result = SupervisorConfig::builder()
            .signal_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_read_buffer() {
        let result = SupervisorConfig::builder().read_buffer_size(0).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
