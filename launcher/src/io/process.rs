//! Child process execution for plan steps.
//!
//! Steps run in the foreground: they inherit stdin/stdout/stderr so installer
//! progress and the application's own output reach the terminal unchanged.
//! Short probes (e.g. `python --version`) use [`run_captured`] instead, which
//! bounds the captured output and never blocks past its timeout.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::outcome::Termination;
use crate::core::plan::StepSpec;

/// Abstraction over how plan steps are executed.
pub trait ProcessRunner {
    /// Run `step` with `workdir` as its working directory and wait for it.
    ///
    /// A step that cannot be spawned is a [`Termination::SpawnFailed`], not an
    /// `Err`; errors are reserved for failures of the launcher itself.
    fn run(&self, step: &StepSpec, workdir: &Path) -> Result<Termination>;
}

/// Runs steps as real foreground child processes.
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    #[instrument(skip_all, fields(step = %step.name, timeout_secs = ?step.timeout_secs))]
    fn run(&self, step: &StepSpec, workdir: &Path) -> Result<Termination> {
        let mut cmd = Command::new(&step.program);
        cmd.args(&step.args).current_dir(workdir);
        // Timed steps get their own process group so a timeout can take down
        // everything they started. Untimed steps stay in the launcher's group
        // and keep receiving terminal signals.
        #[cfg(unix)]
        if step.timeout_secs.is_some() {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        info!(command = %step.command_line(), workdir = %workdir.display(), "spawning step");
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!(err = %e, program = %step.program, "failed to spawn step");
                return Ok(Termination::SpawnFailed {
                    reason: e.to_string(),
                });
            }
        };

        let status = match step.timeout() {
            Some(timeout) => match child.wait_timeout(timeout).context("wait for step")? {
                Some(status) => status,
                None => {
                    warn!(timeout_secs = timeout.as_secs(), "step timed out, killing");
                    kill_step_tree(&mut child)?;
                    return Ok(Termination::TimedOut {
                        secs: timeout.as_secs(),
                    });
                }
            },
            None => child.wait().context("wait for step")?,
        };

        let termination = termination_from_status(status);
        debug!(%termination, "step finished");
        Ok(termination)
    }
}

/// Kill a timed-out step together with every process in its group.
fn kill_step_tree(child: &mut Child) -> Result<()> {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        match Command::new("kill")
            .args(["-s", "KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => debug!(pgid = child.id(), "killed step group"),
            Ok(status) => warn!(exit_code = ?status.code(), "kill of step group failed"),
            Err(e) => warn!(err = %e, "failed to spawn kill for step group"),
        }
    }
    // The group kill usually reaches the child first; this covers the case
    // where it could not be delivered.
    if let Err(e) = child.kill() {
        debug!(err = %e, "direct kill of step failed");
    }
    child.wait().context("wait step after kill")?;
    Ok(())
}

/// Classify an [`ExitStatus`] as an exit code or a terminating signal.
pub fn termination_from_status(status: ExitStatus) -> Termination {
    if let Some(code) = status.code() {
        return Termination::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Termination::Signaled(signal);
        }
    }
    Termination::Exited(crate::exit_codes::INVALID)
}

/// Captured output of a short-lived helper process.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_captured(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CapturedOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning helper process");
    let mut child = cmd.spawn().context("spawn command")?;

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

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let stdout = join_output(stdout_handle).context("join stdout")?;
    let stderr = join_output(stderr_handle).context("join stderr")?;

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CapturedOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

fn join_output(handle: thread::JoinHandle<Result<Vec<u8>>>) -> Result<Vec<u8>> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            buf.extend_from_slice(&chunk[..n.min(remaining)]);
        }
    }

    Ok(buf)
}
