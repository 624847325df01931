// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! REQUEST SENSE — 6-byte CDB filler and command descriptor.
//!
//! CDB layout (SPC):
//!   [0] = 0x03 (REQUEST SENSE)
//!   [1] = DESC (bit 0), other bits reserved=0
//!   [4] = ALLOCATION LENGTH (number of bytes to return)
//!   [5] = CONTROL
//!
//! `desc=false` requests Fixed sense format; `desc=true` requests Descriptor
//! format. The target may still choose format per its mode settings.

use crate::{
    control_block::common::{CDB_LEN, Cdb},
    device::{DataDirection, DeviceError, sg::SgDevice},
    models::execution::CdbReply,
};

pub const REQUEST_SENSE: u8 = 0x03;

/// Fixed-format sense plus room for additional bytes.
pub const DEFAULT_SENSE_ALLOC: u8 = 32;

/// Fill a REQUEST SENSE (6) CDB into `cdb[0..6]`.
#[inline]
pub fn build_request_sense(
    cdb: &mut [u8; CDB_LEN],
    desc: bool,
    allocation_len: u8,
    control: u8,
) {
    cdb.fill(0);
    cdb[0] = REQUEST_SENSE;
    cdb[1] = u8::from(desc); // DESC bit (bit 0)
    cdb[4] = allocation_len;
    cdb[5] = control;
}

/// REQUEST SENSE(6) command descriptor, fixed format.
#[derive(Debug, Clone, Copy)]
pub struct RequestSense {
    pub allocation_len: u8,
}

impl Default for RequestSense {
    fn default() -> Self {
        Self { allocation_len: DEFAULT_SENSE_ALLOC }
    }
}

impl Cdb for RequestSense {
    fn name(&self) -> &'static str {
        "REQUEST SENSE"
    }

    fn execute(&self, device: &mut SgDevice) -> Result<CdbReply, DeviceError> {
        let mut cdb = [0u8; CDB_LEN];
        build_request_sense(&mut cdb, false, self.allocation_len, 0x00);
        let mut data = vec![0u8; self.allocation_len as usize];
        let transferred = device.issue(&cdb[..6], DataDirection::FromDevice, &mut data)?;
        data.truncate(transferred);
        Ok(CdbReply::Data(data))
    }
}
