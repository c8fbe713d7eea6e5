use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::tools::types::{ScriptInvocation, ScriptOutput, ScriptRunner};

/// Runs scripts as child processes. A bare command string goes through the
/// platform shell; a command with explicit args is executed directly.
#[derive(Debug, Clone, Default)]
pub struct ShellScriptRunner {
    default_working_dir: Option<PathBuf>,
}

impl ShellScriptRunner {
    pub fn new(default_working_dir: Option<PathBuf>) -> Self {
        Self {
            default_working_dir,
        }
    }

    async fn resolve_working_dir(&self, requested: Option<&Path>) -> Result<Option<PathBuf>> {
        let Some(dir) = requested.or(self.default_working_dir.as_deref()) else {
            return Ok(None);
        };

        tokio::fs::create_dir_all(dir).await.map_err(|err| {
            Error::Action(format!(
                "failed to create working directory '{}': {err}",
                dir.display()
            ))
        })?;
        Ok(Some(dir.to_path_buf()))
    }

    fn build_command(invocation: &ScriptInvocation) -> Command {
        if invocation.args.is_empty() {
            let shell = if cfg!(windows) { "cmd.exe" } else { "/bin/sh" };
            let shell_flag = if cfg!(windows) { "/C" } else { "-c" };
            let mut cmd = Command::new(shell);
            cmd.arg(shell_flag).arg(&invocation.command);
            cmd
        } else {
            let mut cmd = Command::new(&invocation.command);
            cmd.args(&invocation.args);
            cmd
        }
    }
}

#[async_trait]
impl ScriptRunner for ShellScriptRunner {
    async fn run(&self, invocation: ScriptInvocation) -> Result<ScriptOutput> {
        let working_dir = self
            .resolve_working_dir(invocation.working_dir.as_deref())
            .await?;

        let mut cmd = Self::build_command(&invocation);
        cmd.envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %invocation.command, args = ?invocation.args, "running script");
        let child = cmd.spawn().map_err(|err| {
            Error::Action(format!(
                "failed to spawn '{}': {err}",
                invocation.command
            ))
        })?;

        // Dropping the future on timeout kills the child.
        let output = match timeout(invocation.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(Error::Action(format!(
                    "failed to wait for '{}': {err}",
                    invocation.command
                )));
            }
            Err(_) => {
                return Err(Error::Timeout(format!(
                    "script '{}' timed out after {}ms",
                    invocation.command,
                    invocation.timeout.as_millis()
                )));
            }
        };

        Ok(ScriptOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
