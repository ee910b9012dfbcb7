//! Building and spawning the shell subprocess.

use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::config::{CommandSpec, SupervisorConfig};
use crate::{Error, Result};

/// Script prefix merging the shell's stderr into its stdout for everything
/// that follows, so both streams share one pipe in write order.
const MERGE_STDERR: &str = "exec 2>&1\n";

/// Spawn `spec` under the configured shell.
///
/// The child leads a new process group, has piped stdin and stdout, and is
/// not killed when its handle is dropped: lifetime is controlled only through
/// explicit signals.
pub(crate) fn spawn(config: &SupervisorConfig, spec: &CommandSpec) -> Result<Child> {
    build_command(config, spec)
        .spawn()
        .map_err(Error::ProcessSpawn)
}

/// Build a tokio Command from the config and spec.
fn build_command(config: &SupervisorConfig, spec: &CommandSpec) -> Command {
    let mut cmd = Command::new(config.shell());
    cmd.arg("-c").arg(script(spec.command()));

    if let Some(ref dir) = spec.working_dir {
        cmd.current_dir(dir);
    }

    if !spec.inherit_env {
        cmd.env_clear();
    }
    cmd.envs(&spec.env_vars);

    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::null());

    #[cfg(unix)]
    cmd.process_group(0);
    cmd.kill_on_drop(false);

    cmd
}

fn script(command: &str) -> String {
    format!("{MERGE_STDERR}{command}")
}
