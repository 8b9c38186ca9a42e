//! Deadline enforcement for a running process.
//!
//! The governor is a task that races a sleep against a cancellation token.
//! When the sleep wins it records that the deadline fired, asks the process
//! group to terminate, and escalates to a forced kill if the process is still
//! around after the grace period. The call path reads the fired flag after
//! exit; once set, it overrides whatever the process exit status says.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Timer racing a process toward its deadline.
#[derive(Debug)]
pub struct TimeoutGovernor {
    timeout: Duration,
    fired: Arc<AtomicBool>,
    done: CancellationToken,
    force_kill: CancellationToken,
    handle: JoinHandle<()>,
}

impl TimeoutGovernor {
    /// Start the timer for a process.
    ///
    /// `pid` is the process group leader to signal; `None` skips the
    /// signal step and goes straight to the forced kill after `grace`.
    #[must_use]
    pub fn arm(timeout: Duration, pid: Option<u32>, grace: Duration) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let done = CancellationToken::new();
        let force_kill = CancellationToken::new();

        let handle = tokio::spawn({
            let fired = Arc::clone(&fired);
            let done = done.clone();
            let force_kill = force_kill.clone();
            async move {
                tokio::select! {
                    () = done.cancelled() => return,
                    () = tokio::time::sleep(timeout) => {}
                }

                fired.store(true, Ordering::SeqCst);
                tracing::warn!(?timeout, pid, "Deadline reached, terminating process");
                if let Some(pid) = pid {
                    signal_group(pid, Termination::Graceful);
                }

                tokio::select! {
                    () = done.cancelled() => {}
                    () = tokio::time::sleep(grace) => {
                        tracing::warn!(pid, "Process ignored termination, killing");
                        if let Some(pid) = pid {
                            signal_group(pid, Termination::Forced);
                        }
                        force_kill.cancel();
                    }
                }
            }
        });

        Self {
            timeout,
            fired,
            done,
            force_kill,
            handle,
        }
    }

    /// Configured deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true once the deadline has fired. Never resets.
    #[must_use]
    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves when the governor wants the call path to kill the child.
    pub fn force_kill_requested(&self) -> WaitForCancellationFuture<'_> {
        self.force_kill.cancelled()
    }

    /// Stop the timer after the process exited and report whether it fired.
    pub async fn disarm(self) -> bool {
        let Self {
            fired, done, handle, ..
        } = self;
        done.cancel();
        if let Err(e) = handle.await {
            tracing::debug!(error = %e, "Timeout task ended abnormally");
        }
        fired.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
enum Termination {
    Graceful,
    Forced,
}

/// Signal a whole process group. Already-exited groups are ignored.
#[cfg(unix)]
fn signal_group(pid: u32, termination: Termination) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    let signal = match termination {
        Termination::Graceful => Signal::SIGTERM,
        Termination::Forced => Signal::SIGKILL,
    };
    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::debug!(pid, ?signal, error = %e, "Failed to signal process group"),
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, _termination: Termination) {}
