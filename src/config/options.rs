//! Per-command options.

use std::collections::HashMap;
use std::path::PathBuf;

/// One shell command to run under supervision.
///
/// The command text is handed to the configured shell verbatim, so pipes,
/// redirections and `;`-separated lists all work.
///
/// # Example
///
/// ```ignore
/// use asyncshell::CommandSpec;
///
/// let spec = CommandSpec::new("make test")
///     .working_dir("/src/project")
///     .env("RUST_LOG", "debug")
///     .print_exit_status(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub(crate) command: String,
    pub(crate) working_dir: Option<PathBuf>,
    pub(crate) env_vars: HashMap<String, String>,
    pub(crate) inherit_env: bool,
    pub(crate) print_exit_status: Option<bool>,
}

impl CommandSpec {
    /// Create a spec for `command`, inheriting the host environment.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            env_vars: HashMap::new(),
            inherit_env: true, // Default: inherit parent environment
            print_exit_status: None,
        }
    }

    /// Directory to start the command in (defaults to the host's).
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set one environment variable for the command.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables for the command.
    pub fn envs<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Whether the host environment is passed through.
    ///
    /// When disabled, the command sees only the variables set on this spec.
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Override the registry-wide exit status reporting for this command.
    pub fn print_exit_status(mut self, enabled: bool) -> Self {
        self.print_exit_status = Some(enabled);
        self
    }

    /// The command text.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The working directory, if set.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }

    /// Environment variables set on this spec.
    pub fn env_vars(&self) -> &HashMap<String, String> {
        &self.env_vars
    }
}

impl From<&str> for CommandSpec {
    fn from(command: &str) -> Self {
        CommandSpec::new(command)
    }
}

impl From<String> for CommandSpec {
    fn from(command: String) -> Self {
        CommandSpec::new(command)
    }
}
