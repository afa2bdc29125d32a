// ABOUTME: DeployedProcess wraps a spawned child process: exit status, bounded waits, kill, graceful-then-forced shutdown
// ABOUTME: Combined stdout+stderr is drained line-by-line by a background task that logs each line at target "remote"

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::{Result, TransportError};

/// A process deployed by a `Deploy` implementation.
///
/// Owns the child handle and the task draining its combined output. `kill`
/// targets the whole process group on unix (the child is spawned into its
/// own group), since `tokio::process::Child::kill` only reaches the single
/// child pid and a deployed kernel may itself fork workers.
pub struct DeployedProcess {
    child: Mutex<Child>,
    pid: Option<i32>,
    drain_task: Mutex<Option<JoinHandle<()>>>,
}

impl DeployedProcess {
    /// Spawns `command` with piped stdout/stderr and starts draining them.
    pub fn spawn(mut command: Command) -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        let pid = child.id().map(|p| p as i32);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let drain_task = tokio::spawn(drain_output(stdout, stderr));

        Ok(Self {
            child: Mutex::new(child),
            pid,
            drain_task: Mutex::new(Some(drain_task)),
        })
    }

    /// The child's process id, if it could be determined at spawn time.
    pub fn pid(&self) -> Option<i32> {
        self.pid
    }

    /// Non-blocking: `Some(code)` if the child has already exited.
    pub async fn exit_status(&self) -> Option<i32> {
        let mut child = self.child.lock().await;
        match child.try_wait() {
            Ok(Some(status)) => status.code(),
            _ => None,
        }
    }

    /// Waits up to `bound` for the child to exit.
    pub async fn await_exit(&self, bound: Duration) -> Option<i32> {
        let mut child = self.child.lock().await;
        match timeout(bound, child.wait()).await {
            Ok(Ok(status)) => status.code(),
            _ => None,
        }
    }

    /// Requests termination of the process group (unix) or the child
    /// process (elsewhere).
    pub async fn kill(&self) -> Result<()> {
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;
                if kill(Pid::from_raw(-pid), Signal::SIGKILL).is_ok() {
                    return Ok(());
                }
            }
        }
        let mut child = self.child.lock().await;
        child
            .kill()
            .await
            .map_err(|err| TransportError::Process(err.to_string()))
    }

    /// Waits up to `grace` for the child to exit on its own; if it hasn't,
    /// kills it and waits up to `grace` again for the kill to take effect.
    pub async fn await_or_kill(&self, grace: Duration) -> Result<()> {
        if self.await_exit(grace).await.is_some() {
            return Ok(());
        }
        tracing::warn!("process did not exit within grace period, killing");
        self.kill().await?;
        if self.await_exit(grace).await.is_some() {
            return Ok(());
        }
        Err(TransportError::Process(
            "process did not exit after kill".into(),
        ))
    }
}

impl Drop for DeployedProcess {
    fn drop(&mut self) {
        if let Ok(mut task) = self.drain_task.try_lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

async fn drain_output(
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
) {
    let mut stdout_lines = stdout.map(|s| BufReader::new(s).lines());
    let mut stderr_lines = stderr.map(|s| BufReader::new(s).lines());

    loop {
        if stdout_lines.is_none() && stderr_lines.is_none() {
            break;
        }
        tokio::select! {
            line = next_line(&mut stdout_lines) => {
                match line {
                    Some(line) => tracing::info!(target: "remote", "{line}"),
                    None => stdout_lines = None,
                }
            }
            line = next_line(&mut stderr_lines) => {
                match line {
                    Some(line) => tracing::info!(target: "remote", "{line}"),
                    None => stderr_lines = None,
                }
            }
        }
    }
}

async fn next_line<R: tokio::io::AsyncBufRead + Unpin>(
    lines: &mut Option<tokio::io::Lines<R>>,
) -> Option<String> {
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleep_command(seconds: &str) -> Command {
        let mut command = Command::new("sleep");
        command.arg(seconds);
        command
    }

    #[tokio::test]
    async fn exit_status_is_none_while_running() {
        let process = DeployedProcess::spawn(sleep_command("5")).unwrap();
        assert_eq!(process.exit_status().await, None);
        process.kill().await.unwrap();
    }

    #[tokio::test]
    async fn await_exit_observes_natural_exit() {
        let process = DeployedProcess::spawn(sleep_command("0")).unwrap();
        let code = process.await_exit(Duration::from_secs(5)).await;
        assert_eq!(code, Some(0));
    }

    #[tokio::test]
    async fn await_or_kill_kills_when_grace_expires() {
        let process = DeployedProcess::spawn(sleep_command("30")).unwrap();
        process
            .await_or_kill(Duration::from_millis(100))
            .await
            .unwrap();
        assert!(process.exit_status().await.is_some() || process.await_exit(Duration::from_secs(2)).await.is_some());
    }
}
