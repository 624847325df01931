// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! REPORT LUNS — CDB filler and response parser.
//!
//! CDB layout (SPC):
//!   [0]  = 0xA0 (REPORT LUNS)
//!   [1]  = Service Action (0x00 for REPORT LUNS)
//!   [2]  = SELECT REPORT
//!   [6..9]  = ALLOCATION LENGTH (big-endian u32)
//!   [11] = CONTROL
//!
//! Response starts with:
//!   [0..3] = LUN LIST LENGTH (big-endian u32, multiple of 8)
//!   [4..7] = reserved
//!   [8..]  = LUN entries (8 bytes each)

use anyhow::{Result, anyhow, ensure};
use zerocopy::{
    FromBytes, Immutable, KnownLayout,
    byteorder::{BigEndian, U32, U64},
};

use crate::{
    control_block::common::{CDB_LEN, Cdb},
    device::{DataDirection, DeviceError, sg::SgDevice},
    models::execution::CdbReply,
};

pub const REPORT_LUNS: u8 = 0xA0;

/// Common SELECT REPORT values (byte 2).
pub mod select_report {
    /// All logical unit addresses.
    pub const ALL: u8 = 0x00;
    /// Well known logical unit addresses.
    pub const WELL_KNOWN: u8 = 0x01;
    /// All logical unit addresses (excluding well known) — commonly used.
    pub const ALL_MAPPED: u8 = 0x02;
}

/// Header + 510 LUN entries; enough for anything this crate talks to.
pub const DEFAULT_REPORT_LUNS_ALLOC: u32 = 4096;

/// Fill a REPORT LUNS CDB into `cdb[0..12]`.
#[inline]
pub fn build_report_luns(
    cdb: &mut [u8; CDB_LEN],
    select: u8,
    allocation_len: u32,
    control: u8,
) {
    cdb.fill(0);
    cdb[0] = REPORT_LUNS;
    cdb[1] = 0x00; // Service Action = REPORT LUNS
    cdb[2] = select;
    cdb[6..10].copy_from_slice(&allocation_len.to_be_bytes());
    cdb[11] = control;
}

/// First 8 bytes of the REPORT LUNS parameter data.
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Debug)]
struct LunListHeader {
    lun_list_len: U32<BigEndian>,
    _reserved: [u8; 4],
}

/// One 8-byte LUN entry, kept in its raw big-endian encoding.
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Debug)]
struct LunEntry {
    lun: U64<BigEndian>,
}

/// Parse REPORT LUNS parameter data into raw 8-byte LUN values.
pub fn parse_report_luns(buf: &[u8]) -> Result<Vec<u64>> {
    let (header, rest) = LunListHeader::ref_from_prefix(buf)
        .map_err(|_| anyhow!("REPORT LUNS: need ≥ 8 bytes, got {}", buf.len()))?;

    let list_len = header.lun_list_len.get() as usize;
    ensure!(
        list_len % 8 == 0,
        "REPORT LUNS: list length {list_len} not a multiple of 8"
    );
    ensure!(
        rest.len() >= list_len,
        "REPORT LUNS truncated: header says {list_len} bytes, have {}",
        rest.len()
    );

    let entries = <[LunEntry]>::ref_from_bytes(&rest[..list_len])
        .map_err(|_| anyhow!("REPORT LUNS: misaligned LUN list"))?;
    Ok(entries.iter().map(|entry| entry.lun.get()).collect())
}

/// REPORT LUNS(12) command descriptor (select report 0 by default).
#[derive(Debug, Clone, Copy)]
pub struct ReportLuns {
    pub select: u8,
    pub allocation_len: u32,
}

impl Default for ReportLuns {
    fn default() -> Self {
        Self {
            select: select_report::ALL,
            allocation_len: DEFAULT_REPORT_LUNS_ALLOC,
        }
    }
}

impl Cdb for ReportLuns {
    fn name(&self) -> &'static str {
        "REPORT LUNS"
    }

    fn execute(&self, device: &mut SgDevice) -> Result<CdbReply, DeviceError> {
        let mut cdb = [0u8; CDB_LEN];
        build_report_luns(&mut cdb, self.select, self.allocation_len, 0x00);
        let mut data = vec![0u8; self.allocation_len as usize];
        let transferred =
            device.issue(&cdb[..12], DataDirection::FromDevice, &mut data)?;
        data.truncate(transferred);
        Ok(CdbReply::Data(data))
    }
}
