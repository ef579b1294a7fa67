//! Helpers for running runner subprocesses with timeouts, bounded output,
//! and run-level cancellation.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Interval at which an in-flight wait re-checks the deadline and the
/// cancellation token.
const WAIT_SLICE: Duration = Duration::from_millis(200);

/// Cooperative run-level cancellation shared by every execution unit.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
    pub cancelled: bool,
}

impl CommandOutput {
    /// Combined, lossy text of both streams for reports and summaries.
    pub fn combined_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&String::from_utf8_lossy(&self.stderr));
        }
        if self.stdout_truncated > 0 || self.stderr_truncated > 0 {
            text.push_str(&format!(
                "\n[output truncated: {} bytes dropped]\n",
                self.stdout_truncated + self.stderr_truncated
            ));
        }
        text
    }
}

/// Run a command, capturing stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs; `output_limit_bytes`
/// bounds the amount stored in memory (bytes beyond it are discarded while
/// still draining the pipe). The wait polls in short slices so a timeout or a
/// cancelled token kills the child promptly.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
    cancel: &CancelToken,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            error!(err = %err, "failed to spawn command");
            return Err(err).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let deadline = Instant::now() + timeout;
    let mut timed_out = false;
    let mut cancelled = false;

    let status = loop {
        if let Some(status) = child.wait_timeout(WAIT_SLICE).context("wait for command")? {
            break Some(status);
        }
        if cancel.is_cancelled() {
            warn!("run cancelled, killing command");
            cancelled = true;
        } else if Instant::now() >= deadline {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
        } else {
            continue;
        }
        child.kill().context("kill command")?;
        child.wait().context("wait command after kill")?;
        break None;
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    let code = status.and_then(|status| status.code());
    debug!(exit_code = ?code, timed_out, cancelled, "command finished");
    Ok(CommandOutput {
        code,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
        cancelled,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
