// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Public entry point of the execution engine.

use std::path::Path;

use tracing::{debug, error, info_span};

use crate::{
    cfg::config::Config,
    control_block::Cdb,
    engine::{
        channel::{self, RecvError},
        error::CommandError,
        spawn::{self, SpawnBackend, WorkerFn},
        supervisor, worker,
    },
    models::execution::{CdbReply, ExecutionResult},
};

/// Execute one CDB against `device` inside an isolated worker, using the
/// process-wide configuration for timeout and backend selection.
///
/// Single attempt per call — callers retry if they choose to.
pub fn execute_cdb<C>(device: &Path, cdb: C) -> Result<CdbReply, CommandError>
where C: Cdb + 'static {
    let kind = Config::global().engine.spawn_backend;
    execute_cdb_on(spawn::backend(kind), device, cdb)
}

/// Same contract as [`execute_cdb`], with an explicit spawn backend.
pub fn execute_cdb_on<C>(
    backend: &dyn SpawnBackend,
    device: &Path,
    cdb: C,
) -> Result<CdbReply, CommandError>
where
    C: Cdb + 'static,
{
    let timeout = Config::global().engine.command_timeout;
    let span =
        info_span!("execute_cdb", cdb = cdb.name(), device = %device.display());
    let _guard = span.enter();

    let (receiver, sender) = match channel::channel() {
        Ok(pair) => pair,
        Err(err) => {
            error!(%err, "cannot create worker channel");
            return Err(CommandError::Failed);
        },
    };

    let diag = Config::global().engine.worker_diagnostics.clone();
    let device_path = device.to_path_buf();
    let entry: WorkerFn =
        Box::new(move || worker::worker_entry(sender, &device_path, &cdb, &diag));

    let mut worker = match supervisor::spawn_worker(backend, entry) {
        Ok(worker) => worker,
        Err(err) => {
            error!(%err, backend = backend.name(), "cannot spawn worker");
            return Err(CommandError::Failed);
        },
    };

    match receiver.recv_timeout(timeout) {
        Ok(result) => {
            // The worker finished its I/O; nothing left for it to hang on.
            worker.completed();
            worker.reap();
            finish(result)
        },
        Err(RecvError::Timeout(_)) => {
            error!(worker = worker.id(), ?timeout, "worker did not answer in time");
            worker.timed_out();
            worker.ensure_dead();
            Err(CommandError::Failed)
        },
        Err(RecvError::Disconnected) => {
            error!(worker = worker.id(), "worker exited without reporting a result");
            worker.crashed();
            worker.ensure_dead();
            Err(CommandError::Failed)
        },
        Err(err) => {
            error!(worker = worker.id(), %err, "channel receive failed");
            worker.crashed();
            worker.ensure_dead();
            Err(CommandError::Failed)
        },
    }
}

fn finish(result: ExecutionResult) -> Result<CdbReply, CommandError> {
    match result {
        ExecutionResult::Completed(reply) => {
            debug!("worker reported completion");
            Ok(reply)
        },
        ExecutionResult::CheckCondition(sense) => Err(CommandError::CheckCondition {
            sense_key: sense.key,
            sense_code: sense.code,
        }),
        ExecutionResult::Failed => Err(CommandError::Failed),
    }
}
