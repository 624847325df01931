// SPDX-License-Identifier: AGPL-3.0-or-later GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    control_block::common::{CDB_LEN, Cdb, Disposition},
    device::{DataDirection, DeviceError, sg::SgDevice},
    models::{
        execution::CdbReply,
        sense::{SenseKey, SenseSummary},
    },
};

/// Build a standard TEST UNIT READY CDB with control = 0x00.
#[inline]
pub fn build_test_unit_ready(cdb: &mut [u8; CDB_LEN], control: u8) {
    cdb.fill(0);
    cdb[0] = 0; // TEST UNIT READY(6) = 0x00
    cdb[5] = control;
}

/// TEST UNIT READY(6) — asks whether the unit can accept media-access
/// commands. A NOT READY answer, or a target that does not implement the
/// opcode at all, is part of the command's domain rather than a failure:
/// both map to `Flag(false)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestUnitReady;

impl Cdb for TestUnitReady {
    fn name(&self) -> &'static str {
        "TEST UNIT READY"
    }

    fn execute(&self, device: &mut SgDevice) -> Result<CdbReply, DeviceError> {
        let mut cdb = [0u8; CDB_LEN];
        build_test_unit_ready(&mut cdb, 0x00);
        device.issue(&cdb[..6], DataDirection::None, &mut [])?;
        Ok(CdbReply::Flag(true))
    }

    fn on_check_condition(&self, sense: &SenseSummary) -> Disposition {
        match (sense.key, sense.code.asc, sense.code.ascq) {
            (SenseKey::NotReady, _, _) => Disposition::Benign(CdbReply::Flag(false)),
            // Invalid command operation code
            (SenseKey::IllegalRequest, 0x20, 0x00) => {
                Disposition::Benign(CdbReply::Flag(false))
            },
            _ => Disposition::Fatal,
        }
    }
}
