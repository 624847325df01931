// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The body of an isolated worker: one command, one outcome, one send.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    path::Path,
};

use tracing::{debug, error};

use crate::{
    cfg::logger::WorkerDiagnostics,
    control_block::{Cdb, Disposition},
    device::{DeviceError, sg::SgDevice},
    engine::channel::Sender,
    models::execution::ExecutionResult,
};

/// Run one descriptor and report the outcome over `sender`.
///
/// The parent's subscriber must not be inherited: its writer thread does not
/// survive `fork(2)`. The worker installs its own sink from the passed-in
/// diagnostics value, scoped to this body — ambient global state stays
/// untouched.
pub(crate) fn worker_entry(
    sender: Sender,
    device: &Path,
    cdb: &dyn Cdb,
    diag: &WorkerDiagnostics,
) {
    tracing::subscriber::with_default(diag.subscriber(), || {
        let result = catch_unwind(AssertUnwindSafe(|| run_descriptor(device, cdb)))
            .unwrap_or(ExecutionResult::Failed);
        // Best effort: if the parent is unreachable there is no one left to
        // observe a secondary failure, so the error is swallowed and the
        // worker exits cleanly.
        if let Err(err) = sender.send(&result) {
            debug!(%err, "could not report outcome to parent");
        }
    });
}

/// Scoped-open the handle, execute, classify. The handle drops on every path
/// out of this function.
fn run_descriptor(device: &Path, cdb: &dyn Cdb) -> ExecutionResult {
    let mut handle = match SgDevice::open(device) {
        Ok(handle) => handle,
        Err(err) => {
            error!(%err, device = %device.display(), "cannot open device");
            return ExecutionResult::Failed;
        },
    };

    match cdb.execute(&mut handle) {
        Ok(reply) => ExecutionResult::Completed(reply),
        Err(DeviceError::CheckCondition(sense)) => match cdb.on_check_condition(&sense) {
            Disposition::Benign(reply) => {
                debug!(cdb = cdb.name(), %sense, "benign check condition");
                ExecutionResult::Completed(reply)
            },
            Disposition::Fatal => ExecutionResult::CheckCondition(sense),
        },
        Err(err) => {
            error!(cdb = cdb.name(), %err, "command execution failed");
            ExecutionResult::Failed
        },
    }
}
