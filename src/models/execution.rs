// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

use crate::models::sense::SenseSummary;

/// Reply payload produced by a command descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CdbReply {
    /// Data-in bytes exactly as the device returned them.
    Data(Vec<u8>),
    /// Commands with boolean semantics (TEST UNIT READY).
    Flag(bool),
    /// Data-out / no-data commands that completed.
    Unit,
}

/// The single value a worker writes to its channel.
///
/// Every worker-local failure collapses into one of these before it reaches
/// the wire; only the dispatcher turns them back into errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionResult {
    /// The command ran to completion (possibly via a benign check condition).
    Completed(CdbReply),
    /// The device reported a non-benign check condition.
    CheckCondition(SenseSummary),
    /// Anything else: open failure, transport error, panic.
    Failed,
}
