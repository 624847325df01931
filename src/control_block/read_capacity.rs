// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! READ CAPACITY(10) — CDB filler and parameter-data parser.

use anyhow::{Result, anyhow};
use zerocopy::{
    FromBytes, Immutable, KnownLayout,
    byteorder::{BigEndian, U32},
};

use crate::{
    control_block::common::{CDB_LEN, Cdb},
    device::{DataDirection, DeviceError, sg::SgDevice},
    models::execution::CdbReply,
};

pub const READ_CAPACITY10: u8 = 0x25;

/// Parameter data returned by READ CAPACITY(10) is always 8 bytes.
pub const READ_CAPACITY10_DATA_LEN: usize = 8;

/// Build a **READ CAPACITY(10)** CDB (opcode 0x25).
///
/// `lba` is only meaningful with `pmi = true`; with `pmi = false` the target
/// returns the maximum LBA and the logical block length.
#[inline]
pub fn build_read_capacity10(cdb: &mut [u8; CDB_LEN], lba: u32, pmi: bool, control: u8) {
    cdb.fill(0);
    cdb[0] = READ_CAPACITY10;
    cdb[2..6].copy_from_slice(&lba.to_be_bytes()); // only used if PMI=1
    cdb[8] = u8::from(pmi); // PMI bit (bit 0)
    cdb[9] = control;
}

/// Raw 8-byte parameter data, big-endian as on the wire.
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Debug)]
struct Capacity10Raw {
    max_lba: U32<BigEndian>,
    block_len: U32<BigEndian>,
}

/// Decoded READ CAPACITY(10) answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity10 {
    /// Highest valid LBA on the device.
    pub max_lba: u32,
    /// Size of each logical block in bytes.
    pub block_len: u32,
}

impl Capacity10 {
    #[inline]
    pub fn total_bytes(&self) -> u64 {
        (self.max_lba as u64 + 1) * self.block_len as u64
    }

    /// A saturated max LBA means the device is larger than 2 TB and wants
    /// READ CAPACITY(16) instead.
    #[inline]
    pub fn indicates_overflow(&self) -> bool {
        self.max_lba == u32::MAX
    }
}

/// Parse READ CAPACITY(10) parameter data (needs ≥ 8 bytes).
pub fn parse_read_capacity10(buf: &[u8]) -> Result<Capacity10> {
    let (raw, _rest) = Capacity10Raw::ref_from_prefix(buf)
        .map_err(|_| anyhow!("READ CAPACITY(10): need ≥ 8 bytes, got {}", buf.len()))?;
    Ok(Capacity10 { max_lba: raw.max_lba.get(), block_len: raw.block_len.get() })
}

/// READ CAPACITY(10) command descriptor (PMI=0: whole-device answer).
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadCapacity10;

impl Cdb for ReadCapacity10 {
    fn name(&self) -> &'static str {
        "READ CAPACITY(10)"
    }

    fn execute(&self, device: &mut SgDevice) -> Result<CdbReply, DeviceError> {
        let mut cdb = [0u8; CDB_LEN];
        build_read_capacity10(&mut cdb, 0, false, 0x00);
        let mut data = [0u8; READ_CAPACITY10_DATA_LEN];
        let transferred =
            device.issue(&cdb[..10], DataDirection::FromDevice, &mut data)?;
        Ok(CdbReply::Data(data[..transferred].to_vec()))
    }
}
