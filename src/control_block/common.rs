// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use enum_dispatch::enum_dispatch;

use crate::{
    device::{DeviceError, sg::SgDevice},
    models::{execution::CdbReply, sense::SenseSummary},
};

/// Every CDB is built into a fixed 16-byte buffer; commands pass the prefix
/// they actually use to the device.
pub const CDB_LEN: usize = 16;

/// What the worker should do with a check condition for a given command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Part of the command's domain — answer with this reply instead of an
    /// error (TEST UNIT READY on a spun-down unit, for example).
    Benign(CdbReply),
    /// Surface the sense data to the caller.
    Fatal,
}

/// An executable command descriptor.
///
/// Descriptors are opaque to the engine: it only ever executes them against
/// a handle it opened and asks them to classify check conditions. Callers
/// supply their own implementations alongside the ones in this module.
#[enum_dispatch]
pub trait Cdb: Send {
    fn name(&self) -> &'static str;

    /// Issue the command against an open handle.
    fn execute(&self, device: &mut SgDevice) -> Result<CdbReply, DeviceError>;

    /// Classify a check condition. Commands without benign device states
    /// keep the default.
    fn on_check_condition(&self, _sense: &SenseSummary) -> Disposition {
        Disposition::Fatal
    }
}
