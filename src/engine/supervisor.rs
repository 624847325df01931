// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Worker lifecycle ownership: spawn, forced termination, reaping.
//!
//! Every worker ends in [`WorkerState::Joined`] before its dispatcher call
//! returns; there is no path that leaves an orphan or a zombie behind.

use tracing::{debug, warn};

use crate::engine::spawn::{SpawnBackend, SpawnError, WorkerFn, WorkerHandle};

/// Lifecycle of one worker, as observed by the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Spawned,
    Running,
    /// The channel yielded a value before the deadline.
    Completed,
    /// The deadline elapsed first.
    TimedOut,
    /// The channel closed with no value and no timeout.
    CrashedSilently,
    Killed,
    /// Terminal; no further operations are valid.
    Joined,
}

fn valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use WorkerState::*;
    matches!(
        (from, to),
        (Spawned, Running)
            | (Running, Completed)
            | (Running, TimedOut)
            | (Running, CrashedSilently)
            | (TimedOut, Killed)
            | (CrashedSilently, Killed)
            | (Completed, Joined)
            | (Killed, Joined)
    )
}

/// One supervised worker. Exactly one exists per dispatcher call.
pub struct Worker {
    handle: Box<dyn WorkerHandle>,
    state: WorkerState,
}

/// Spawn `entry` on `backend`. The worker counts as running once the OS
/// confirms the spawn.
pub fn spawn_worker(
    backend: &dyn SpawnBackend,
    entry: WorkerFn,
) -> Result<Worker, SpawnError> {
    let handle = backend.spawn(entry)?;
    let mut worker = Worker { handle, state: WorkerState::Spawned };
    worker.transition(WorkerState::Running);
    Ok(worker)
}

impl Worker {
    pub fn id(&self) -> i32 {
        self.handle.id()
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn transition(&mut self, next: WorkerState) {
        debug_assert!(
            valid_transition(self.state, next),
            "invalid worker transition {:?} -> {next:?}",
            self.state
        );
        debug!(worker = self.handle.id(), from = ?self.state, to = ?next, "worker state");
        self.state = next;
    }

    pub fn completed(&mut self) {
        self.transition(WorkerState::Completed);
    }

    pub fn timed_out(&mut self) {
        self.transition(WorkerState::TimedOut);
    }

    pub fn crashed(&mut self) {
        self.transition(WorkerState::CrashedSilently);
    }

    /// Success path: the worker already finished its I/O, so only the exit
    /// needs collecting. A reap failure here cannot invalidate the result;
    /// it is logged and the call proceeds.
    pub fn reap(&mut self) {
        if let Err(err) = self.handle.join() {
            warn!(worker = self.handle.id(), %err, "failed to reap finished worker");
        }
        self.transition(WorkerState::Joined);
    }

    /// Failure path: force-kill if still alive (skipped when the worker
    /// already exited), then reap.
    pub fn ensure_dead(&mut self) {
        if self.handle.is_alive() {
            debug!(worker = self.handle.id(), "terminating worker");
            if let Err(err) = self.handle.kill() {
                warn!(worker = self.handle.id(), %err, "failed to kill worker");
            }
        }
        self.transition(WorkerState::Killed);
        if let Err(err) = self.handle.join() {
            warn!(worker = self.handle.id(), %err, "failed to reap killed worker");
        }
        self.transition(WorkerState::Joined);
    }
}
