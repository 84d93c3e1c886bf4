// src/exec/shell.rs

//! External command jobs.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::exec::{BoxFuture, Runnable};

/// A job that runs `argv[0]` with the remaining tokens as arguments,
/// optionally inside `dir`.
///
/// The command is executed directly, not through a shell. Its stdout is
/// inherited; stderr lines are forwarded to the log at `debug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellJob {
    argv: Vec<String>,
    dir: Option<PathBuf>,
}

impl ShellJob {
    pub fn new(argv: Vec<String>, dir: Option<PathBuf>) -> Self {
        Self { argv, dir }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn dir(&self) -> Option<&PathBuf> {
        self.dir.as_ref()
    }

    fn command_line(&self) -> String {
        self.argv.join(" ")
    }

    async fn run_inner(&self) -> Result<bool> {
        let (program, args) = self
            .argv
            .split_first()
            .context("shell job has an empty command")?;

        info!(cmd = %self.command_line(), dir = ?self.dir, "starting command");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for '{}'", self.command_line()))?;

        // Always consume stderr so buffers don't fill; log at debug.
        let stderr_task = child.stderr.take().map(|stderr| {
            let cmd_line = self.command_line();
            tokio::spawn(async move {
                let reader = BufReader::new(stderr);
                let mut lines = reader.lines();

                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(cmd = %cmd_line, "stderr: {}", line);
                }
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of '{}'", self.command_line()))?;

        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        let code = status.code().unwrap_or(-1);
        if status.success() {
            info!(cmd = %self.command_line(), exit_code = code, "command exited");
        } else {
            warn!(cmd = %self.command_line(), exit_code = code, "command failed");
        }

        Ok(status.success())
    }
}

impl Runnable for ShellJob {
    fn run(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match self.run_inner().await {
                Ok(success) => success,
                Err(err) => {
                    error!(cmd = %self.command_line(), error = %err, "command execution error");
                    false
                }
            }
        })
    }

    fn describe(&self) -> String {
        match &self.dir {
            Some(dir) => format!("(cd {} && {})", dir.display(), self.command_line()),
            None => self.command_line(),
        }
    }
}
