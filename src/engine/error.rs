// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

use crate::models::sense::{AdditionalCode, SenseKey};

/// The complete error surface of the execution engine.
///
/// A call yields either a fully valid reply or one of these two; nothing
/// partial ever escapes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Timeout, worker crash, channel breakage, spawn failure or any other
    /// unclassified problem. Terminal for the call; never retried here.
    #[error("SCSI command failed")]
    Failed,
    /// The device reported a check condition that the command does not treat
    /// as benign. Sense key and code are preserved verbatim.
    #[error("SCSI check condition: {sense_key:?} {sense_code}")]
    CheckCondition {
        sense_key: SenseKey,
        sense_code: AdditionalCode,
    },
}
