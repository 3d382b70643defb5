//! Run an external program as a byte filter under a hard deadline.
//!
//! [`execute`] wires the child's three standard streams as pipes and runs one
//! pump per stream on a scoped thread:
//!
//! ```text
//!   source ──stdin pump──▶ ┌───────┐ ──stdout pump──▶ sink
//!                          │ child │
//!                          └───────┘ ──stderr pump──▶ diagnostics
//! ```
//!
//! The calling thread supervises. It first waits for the stdout and stderr
//! pumps to reach end-of-stream, then for the process to exit, both bounded
//! by the same deadline. When the deadline passes the child is killed, which
//! closes its pipes and releases any pump still blocked on them. On Unix the
//! child leads its own process group and the whole group is killed, so a
//! helper process that inherited the pipes cannot hold them open. Because
//! the pumps are scoped threads, none of them outlives the call.
//!
//! The stdin pump is deliberately left out of the first wait: a child may
//! stop reading its input early and still finish cleanly. Its result is
//! collected when the pumps are joined.
//!
//! ## Outcome precedence
//!
//! | Situation | Result |
//! |---|---|
//! | Deadline passed before exit | [`PipelineError::DeadlineExceeded`] |
//! | Sink or stderr copy failed | [`PipelineError::PumpFailure`] (child is killed) |
//! | Exit status non-zero | [`PipelineError::NonZeroExit`] with captured stderr |
//! | Exit 0 but a copy failed | [`PipelineError::PumpFailure`] |
//! | Exit 0, all copies complete | [`ExecutionReport`] |
//!
//! The sink is never rolled back: on any failure it may hold partial output.

mod command;
mod pump;

pub use command::CommandSpec;
pub use pump::Stream;

use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Everything the child wrote to stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<u8>);

impl Diagnostics {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<no stderr output>")
        } else {
            f.write_str(String::from_utf8_lossy(&self.0).trim_end())
        }
    }
}

/// Coarse failure class, for callers that only need to pick a remedy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Check the executable path and its permissions.
    Start,
    /// Widen the deadline or check system load.
    Deadline,
    /// Check the source and sink.
    Pump,
    /// Inspect the captured stderr.
    NonZeroExit,
    /// The OS could not report on the child.
    Wait,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to start {}: {source}", executable.display())]
    StartFailure {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Deadline of {deadline:?} exceeded, process {pid} was terminated")]
    DeadlineExceeded {
        deadline: Duration,
        pid: u32,
        diagnostics: Diagnostics,
    },
    #[error("I/O error on child {stream}: {source}")]
    PumpFailure {
        stream: Stream,
        #[source]
        source: io::Error,
    },
    #[error("Process exited with {status}: {diagnostics}")]
    NonZeroExit {
        status: ExitStatus,
        diagnostics: Diagnostics,
    },
    #[error("Failed to wait for process {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::StartFailure { .. } => FailureKind::Start,
            PipelineError::DeadlineExceeded { .. } => FailureKind::Deadline,
            PipelineError::PumpFailure { .. } => FailureKind::Pump,
            PipelineError::NonZeroExit { .. } => FailureKind::NonZeroExit,
            PipelineError::Wait { .. } => FailureKind::Wait,
        }
    }

    /// Captured stderr, for the variants that have any.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            PipelineError::DeadlineExceeded { diagnostics, .. }
            | PipelineError::NonZeroExit { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

/// Summary of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub pid: u32,
    pub status: ExitStatus,
    /// Bytes delivered to the child's stdin.
    pub bytes_in: u64,
    /// Bytes written to the sink.
    pub bytes_out: u64,
    pub elapsed: Duration,
}

/// How supervision of the child ended.
enum Outcome {
    Exited(ExitStatus),
    Expired,
    /// An output pump failed; the child has been killed.
    Aborted(Stream),
    WaitFailed(io::Error),
}

struct Joined {
    outcome: Outcome,
    stdin: io::Result<u64>,
    stdout: io::Result<u64>,
    stderr: io::Result<u64>,
}

/// Run `spec`, streaming `source` into the child and its stdout into `sink`.
///
/// `source` and `sink` are only borrowed: opening and closing them stays with
/// the caller. Returns once the child has exited or been killed and every
/// pump has finished.
pub fn execute<R, W>(
    spec: &CommandSpec,
    source: &mut R,
    sink: &mut W,
) -> Result<ExecutionReport, PipelineError>
where
    R: Read + Send + ?Sized,
    W: Write + Send + ?Sized,
{
    if spec.deadline.is_zero() {
        return Err(PipelineError::StartFailure {
            executable: spec.executable.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "deadline must be positive"),
        });
    }

    let started = Instant::now();
    // A deadline too far out to represent is no deadline at all.
    let deadline = started.checked_add(spec.deadline);

    let mut command = Command::new(&spec.executable);
    command
        .args(&spec.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    own_process_group(&mut command);
    let mut child = command
        .spawn()
        .map_err(|source| PipelineError::StartFailure {
            executable: spec.executable.clone(),
            source,
        })?;
    let pid = child.id();
    debug!(pid, executable = %spec.executable.display(), args = ?spec.args, "spawned child");

    let (Some(stdin), Some(stdout), Some(stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        terminate(&mut child);
        return Err(PipelineError::StartFailure {
            executable: spec.executable.clone(),
            source: io::Error::other("child standard streams were not captured"),
        });
    };

    let mut captured = Vec::new();
    let joined = thread::scope(|scope| {
        let (events, finished) = mpsc::channel();

        let stdin_pump = scope.spawn(move || pump::feed(source, stdin));

        let stdout_events = events.clone();
        let stdout_pump = scope.spawn(move || {
            let result = pump::drain(stdout, sink);
            let _ = stdout_events.send((Stream::Stdout, result.is_ok()));
            result
        });

        let diagnostics = &mut captured;
        let stderr_pump = scope.spawn(move || {
            let result = pump::drain(stderr, diagnostics);
            let _ = events.send((Stream::Stderr, result.is_ok()));
            result
        });

        let outcome = supervise(&mut child, &finished, deadline);

        Joined {
            outcome,
            stdin: join(stdin_pump),
            stdout: join(stdout_pump),
            stderr: join(stderr_pump),
        }
    });

    let elapsed = started.elapsed();
    let diagnostics = Diagnostics(captured);
    let Joined {
        outcome,
        stdin,
        stdout,
        stderr,
    } = joined;

    let status = match outcome {
        Outcome::Exited(status) => status,
        Outcome::Expired => {
            warn!(pid, ?elapsed, deadline = ?spec.deadline, "deadline exceeded, child terminated");
            return Err(PipelineError::DeadlineExceeded {
                deadline: spec.deadline,
                pid,
                diagnostics,
            });
        }
        Outcome::Aborted(stream) => {
            let failed = match stream {
                Stream::Stdout => stdout.err(),
                Stream::Stderr => stderr.err(),
                Stream::Stdin => stdin.err(),
            };
            return Err(PipelineError::PumpFailure {
                stream,
                source: failed.unwrap_or_else(|| io::Error::other("pump stopped early")),
            });
        }
        Outcome::WaitFailed(source) => return Err(PipelineError::Wait { pid, source }),
    };

    if !status.success() {
        warn!(pid, %status, stderr = %diagnostics, "child exited unsuccessfully");
        return Err(PipelineError::NonZeroExit {
            status,
            diagnostics,
        });
    }

    let bytes_out = stdout.map_err(|source| PipelineError::PumpFailure {
        stream: Stream::Stdout,
        source,
    })?;
    stderr.map_err(|source| PipelineError::PumpFailure {
        stream: Stream::Stderr,
        source,
    })?;
    let bytes_in = stdin.map_err(|source| PipelineError::PumpFailure {
        stream: Stream::Stdin,
        source,
    })?;

    if !diagnostics.is_empty() {
        debug!(pid, stderr = %diagnostics, "child wrote to stderr");
    }
    debug!(pid, bytes_in, bytes_out, ?elapsed, "child finished");

    Ok(ExecutionReport {
        pid,
        status,
        bytes_in,
        bytes_out,
        elapsed,
    })
}

/// Wait for both output pumps, then for exit, never past `deadline`.
///
/// Every path that does not end in an observed exit kills and reaps the
/// child first, so the pumps are guaranteed to unblock. `None` waits
/// without a bound.
fn supervise(
    child: &mut Child,
    finished: &Receiver<(Stream, bool)>,
    deadline: Option<Instant>,
) -> Outcome {
    // The channel disconnects once both output pumps have returned.
    loop {
        let event = match deadline {
            Some(deadline) => {
                finished.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => finished.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match event {
            Ok((stream, true)) => debug!(%stream, "pump reached end of stream"),
            Ok((stream, false)) => {
                terminate(child);
                return Outcome::Aborted(stream);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                terminate(child);
                return Outcome::Expired;
            }
        }
    }

    let waited = match deadline {
        Some(deadline) => child.wait_timeout(deadline.saturating_duration_since(Instant::now())),
        None => child.wait().map(Some),
    };
    match waited {
        Ok(Some(status)) => Outcome::Exited(status),
        Ok(None) => {
            terminate(child);
            Outcome::Expired
        }
        Err(e) => {
            terminate(child);
            Outcome::WaitFailed(e)
        }
    }
}

/// Make the child the leader of a new process group, so [`terminate`] can
/// reach anything it spawns.
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// Kill the child's process group and reap the child. Errors are logged
/// only: the child may already be gone.
fn terminate(child: &mut Child) {
    let pid = child.id();
    kill_group(child);
    if let Err(e) = child.wait() {
        warn!(pid, error = %e, "failed to reap child");
    }
}

#[cfg(unix)]
fn kill_group(child: &mut Child) {
    let pid = child.id();
    // The child is not reaped yet, so its pid still names its group.
    let killed = libc::pid_t::try_from(pid)
        .map(|pgid| unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0)
        .unwrap_or(false);
    if !killed {
        debug!(pid, error = %io::Error::last_os_error(), "killpg failed, killing child only");
        if let Err(e) = child.kill() {
            debug!(pid, error = %e, "kill failed, child already exited");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(pid = child.id(), error = %e, "kill failed, child already exited");
    }
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
