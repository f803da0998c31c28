//! Task runner boundary: how a pipeline step is actually executed.
//!
//! The watch loop only builds [`Invocation`]s; a [`TaskRunner`] turns them into
//! processes. [`ProcessRunner`] is the default, backed by `tokio::process`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::error::PipelineError;
use crate::streams::StreamSinks;

/// A program, its arguments and the directory to run it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I, dir: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
            dir: dir.to_path_buf(),
        }
    }

    /// Run `command` through the platform shell.
    pub fn shell(command: &str, dir: &Path) -> Self {
        if cfg!(windows) {
            Self::new("cmd", ["/C", command], dir)
        } else {
            Self::new("sh", ["-c", command], dir)
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a step that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl StepOutput {
    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "signal".to_string(),
        }
    }
}

/// A long-lived process started by the run stage.
#[async_trait]
pub trait RunningProcess: Send {
    /// Stop the process if it is still alive.
    async fn stop(&mut self) -> Result<(), PipelineError>;
}

#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Run to completion and capture output.
    async fn execute(&self, invocation: &Invocation) -> Result<StepOutput, PipelineError>;

    /// Start without waiting; output is forwarded to `sinks` as it arrives.
    async fn spawn(
        &self,
        invocation: &Invocation,
        sinks: Arc<StreamSinks>,
    ) -> Result<Box<dyn RunningProcess>, PipelineError>;
}

/// Runs invocations as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl TaskRunner for ProcessRunner {
    async fn execute(&self, invocation: &Invocation) -> Result<StepOutput, PipelineError> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PipelineError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(StepOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn spawn(
        &self,
        invocation: &Invocation,
        sinks: Arc<StreamSinks>,
    ) -> Result<Box<dyn RunningProcess>, PipelineError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // `go run` starts the built program as its own child; a fresh process
        // group is the only handle that reaches it.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| PipelineError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        let group = child.id();

        if let Some(stdout) = child.stdout.take() {
            let sinks = sinks.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    sinks.out(&line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    sinks.err(&line);
                }
            });
        }

        Ok(Box::new(ChildProcess {
            child,
            group,
            program: invocation.program.clone(),
        }))
    }
}

struct ChildProcess {
    child: Child,
    /// Process group led by `child`, cleared once signalled.
    #[cfg_attr(not(unix), allow(dead_code))]
    group: Option<u32>,
    program: String,
}

impl ChildProcess {
    /// SIGKILL everything in the group. A group that is already gone is fine.
    fn kill_group(&mut self) -> std::io::Result<()> {
        #[cfg(unix)]
        if let Some(pgid) = self.group.take() {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(errno) => return Err(errno.into()),
            }
        }
        Ok(())
    }

    fn stop_error(&self, source: std::io::Error) -> PipelineError {
        PipelineError::Stop {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl RunningProcess for ChildProcess {
    async fn stop(&mut self) -> Result<(), PipelineError> {
        if let Err(err) = self.kill_group() {
            return Err(self.stop_error(err));
        }
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        // Reaps the leader; the signal itself is a no-op after the group kill.
        match self.child.kill().await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.stop_error(err)),
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if let Err(err) = self.kill_group() {
            tracing::warn!(program = %self.program, error = %err, "failed to kill run-stage process group");
        }
    }
}
