// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Pluggable worker spawn backends.
//!
//! The engine's contract is identical over both backends: `process` is a
//! native `fork(2)` child and carries the full isolation guarantee; `thread`
//! is a lightweight in-process worker that trades the kill guarantee for
//! spawn cost.

use std::{
    io,
    panic::{AssertUnwindSafe, catch_unwind},
    thread,
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    libc,
    sys::{
        signal::{Signal, kill},
        wait::{WaitPidFlag, WaitStatus, waitpid},
    },
    unistd::{ForkResult, Pid, fork},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Entry point handed to a backend; runs exactly once inside the worker.
pub type WorkerFn = Box<dyn FnOnce() + Send + 'static>;

/// How long a finished-but-not-yet-exited worker thread is awaited before
/// being detached.
const THREAD_JOIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to fork worker: {0}")]
    Fork(Errno),
    #[error("failed to spawn worker thread: {0}")]
    Thread(io::Error),
    #[error("failed to kill worker {pid}: {source}")]
    Kill { pid: i32, source: Errno },
    #[error("failed to reap worker {pid}: {source}")]
    Reap { pid: i32, source: Errno },
}

/// Backend selector, part of the process-wide configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Process,
    Thread,
}

/// A spawned worker as the supervisor sees it.
pub trait WorkerHandle: Send {
    /// OS identifier of the worker, for logs.
    fn id(&self) -> i32;
    fn is_alive(&mut self) -> bool;
    /// Non-graceful, immediate termination. Idempotent: a worker that
    /// already exited is skipped.
    fn kill(&mut self) -> Result<(), SpawnError>;
    /// Blocking reap. After this returns no trace of the worker remains.
    fn join(&mut self) -> Result<(), SpawnError>;
}

pub trait SpawnBackend: Sync {
    fn name(&self) -> &'static str;
    fn spawn(&self, entry: WorkerFn) -> Result<Box<dyn WorkerHandle>, SpawnError>;
}

/// Resolve the configured backend to its singleton.
pub fn backend(kind: BackendKind) -> &'static dyn SpawnBackend {
    static FORK: ForkBackend = ForkBackend;
    static THREAD: ThreadBackend = ThreadBackend;
    match kind {
        BackendKind::Process => &FORK,
        BackendKind::Thread => &THREAD,
    }
}

/// Native `fork(2)` backend — the isolation boundary the engine exists for.
pub struct ForkBackend;

impl SpawnBackend for ForkBackend {
    fn name(&self) -> &'static str {
        "process"
    }

    fn spawn(&self, entry: WorkerFn) -> Result<Box<dyn WorkerHandle>, SpawnError> {
        // SAFETY: the child runs `entry` and `_exit`s; it never unwinds back
        // into the caller's stack.
        match unsafe { fork() }.map_err(SpawnError::Fork)? {
            ForkResult::Parent { child } => {
                // Dropping the un-run entry closes the parent's copy of the
                // channel sender; EOF detection depends on it.
                drop(entry);
                debug!(pid = child.as_raw(), "spawned worker process");
                Ok(Box::new(ForkWorker { pid: child, reaped: false }))
            },
            ForkResult::Child => {
                let _ = catch_unwind(AssertUnwindSafe(entry));
                // Skip the atexit machinery inherited from the parent.
                unsafe { libc::_exit(0) }
            },
        }
    }
}

struct ForkWorker {
    pid: Pid,
    reaped: bool,
}

impl WorkerHandle for ForkWorker {
    fn id(&self) -> i32 {
        self.pid.as_raw()
    }

    fn is_alive(&mut self) -> bool {
        if self.reaped {
            return false;
        }
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(status) => {
                debug!(pid = self.pid.as_raw(), ?status, "worker already exited");
                self.reaped = true;
                false
            },
            // ECHILD: someone already reaped it.
            Err(_) => {
                self.reaped = true;
                false
            },
        }
    }

    fn kill(&mut self) -> Result<(), SpawnError> {
        if self.reaped {
            return Ok(());
        }
        match kill(self.pid, Signal::SIGKILL) {
            // ESRCH: exited between the liveness check and the signal.
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(source) => Err(SpawnError::Kill { pid: self.pid.as_raw(), source }),
        }
    }

    fn join(&mut self) -> Result<(), SpawnError> {
        while !self.reaped {
            match waitpid(self.pid, None) {
                Ok(status) => {
                    debug!(pid = self.pid.as_raw(), ?status, "reaped worker");
                    self.reaped = true;
                },
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => self.reaped = true,
                Err(source) => {
                    return Err(SpawnError::Reap { pid: self.pid.as_raw(), source });
                },
            }
        }
        Ok(())
    }
}

/// In-process worker backend. Spawn is cheap, but a thread cannot be
/// terminated from outside: `kill` only logs, and a worker that outlives its
/// deadline is detached rather than joined.
pub struct ThreadBackend;

impl SpawnBackend for ThreadBackend {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn spawn(&self, entry: WorkerFn) -> Result<Box<dyn WorkerHandle>, SpawnError> {
        let handle = thread::Builder::new()
            .name("scsi-worker".into())
            .spawn(entry)
            .map_err(SpawnError::Thread)?;
        Ok(Box::new(ThreadWorker { handle: Some(handle) }))
    }
}

struct ThreadWorker {
    handle: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle for ThreadWorker {
    fn id(&self) -> i32 {
        std::process::id() as i32
    }

    fn is_alive(&mut self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn kill(&mut self) -> Result<(), SpawnError> {
        if self.is_alive() {
            warn!("worker thread cannot be force-killed; it will be detached");
        }
        Ok(())
    }

    fn join(&mut self) -> Result<(), SpawnError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let grace_until = Instant::now() + THREAD_JOIN_GRACE;
        while !handle.is_finished() && Instant::now() < grace_until {
            thread::sleep(Duration::from_millis(5));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            warn!("worker thread still running past its deadline; detaching");
            drop(handle);
        }
        Ok(())
    }
}
