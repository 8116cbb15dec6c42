//! OS process capability: spawn, await exit, pid-directed kill.
//!
//! A spawned child is exclusively owned by its [`ProcessHandle`]; the run
//! loop that created it is the only code allowed to wait on it. Termination
//! requests from other execution contexts (overlap cancellation, removal,
//! shutdown) are pid-directed via [`kill`], so the owning loop still
//! observes the exit and reaps the child.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

/// Live handle to one spawned attempt.
pub struct ProcessHandle {
    child: Child,
    pid: u32,
}

impl ProcessHandle {
    /// Pid of the child, captured at spawn time.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Waits for the child to exit and reaps it.
    ///
    /// A nonzero exit is a normal `Ok` carrying the status; `Err` means the
    /// wait itself failed at the OS level.
    pub async fn wait(mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }
}

/// Starts `path` with `args`, optionally in `workdir`.
///
/// Stdio is directed to the null device: scheduled jobs are not interactive
/// and must not write through the host's descriptors. The child is killed
/// if the handle is dropped without being waited on.
pub fn spawn(path: &Path, args: &[String], workdir: Option<&Path>) -> io::Result<ProcessHandle> {
    let mut cmd = Command::new(path);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    if let Some(dir) = workdir {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn()?;
    let pid = child.id().unwrap_or_default();
    Ok(ProcessHandle { child, pid })
}

/// Sends SIGKILL to `pid`.
///
/// SIGKILL rather than SIGTERM: the scheduler offers children no
/// cooperative shutdown channel, and cancellation must not depend on the
/// child's signal handling.
#[cfg(unix)]
pub fn kill(pid: u32) -> io::Result<()> {
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Pid-directed kill is unavailable off unix.
#[cfg(not(unix))]
pub fn kill(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "pid-directed kill is only supported on unix",
    ))
}
