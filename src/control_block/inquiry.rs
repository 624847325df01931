// SPDX-License-Identifier: AGPL-3.0-or-later GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! INQUIRY (6) — CDB filler and standard-data parser.
//!
//! CDB layout (SPC):
//!   [0] = 0x12 (INQUIRY)
//!   [1] = EVPD (bit 0); other bits reserved (CMDDT obsolete → 0)
//!   [2] = Page Code (only when EVPD=1; else 0)
//!   [3] = Subpage Code
//!   [4] = Allocation Length (u8)
//!   [5] = Control

use anyhow::{Result, bail};

use crate::{
    control_block::common::{CDB_LEN, Cdb},
    device::{DataDirection, DeviceError, sg::SgDevice},
    models::execution::CdbReply,
};

pub const INQUIRY_OPCODE: u8 = 0x12;

/// Standard INQUIRY data is 36 bytes minimum; 96 leaves room for the
/// version-descriptor tail without a second round-trip.
pub const DEFAULT_INQUIRY_ALLOC: u8 = 96;

/// Fill a **Standard INQUIRY (EVPD=0)** CDB.
#[inline]
pub fn build_inquiry_standard(cdb: &mut [u8; CDB_LEN], allocation_len: u8, control: u8) {
    cdb.fill(0);
    cdb[0] = INQUIRY_OPCODE;
    cdb[1] = 0x00; // EVPD=0
    cdb[4] = allocation_len;
    cdb[5] = control;
}

/// Standard INQUIRY(6) command descriptor. The worker ships the raw data-in
/// bytes back; parsing happens on the caller's side.
#[derive(Debug, Clone, Copy)]
pub struct StandardInquiry {
    pub allocation_len: u8,
}

impl Default for StandardInquiry {
    fn default() -> Self {
        Self { allocation_len: DEFAULT_INQUIRY_ALLOC }
    }
}

impl Cdb for StandardInquiry {
    fn name(&self) -> &'static str {
        "INQUIRY"
    }

    fn execute(&self, device: &mut SgDevice) -> Result<CdbReply, DeviceError> {
        let mut cdb = [0u8; CDB_LEN];
        build_inquiry_standard(&mut cdb, self.allocation_len, 0x00);
        let mut data = vec![0u8; self.allocation_len as usize];
        let transferred = device.issue(&cdb[..6], DataDirection::FromDevice, &mut data)?;
        data.truncate(transferred);
        Ok(CdbReply::Data(data))
    }
}

/// Parsed view of the fixed part of standard INQUIRY data.
#[derive(Debug, Clone)]
pub struct InquiryStandard {
    pub peripheral_qualifier: u8, // bits 7..5 of byte0
    pub device_type: u8,          // bits 4..0 of byte0
    pub rmb: bool,                // byte1 bit7
    pub version: u8,              // byte2
    pub response_data_format: u8, // byte3 low nibble
    pub additional_length: u8,    // byte4
    pub vendor_id: String,        // bytes 8..16
    pub product_id: String,       // bytes 16..32
    pub product_rev: String,      // bytes 32..36
}

impl InquiryStandard {
    pub fn device_type_str(&self) -> &'static str {
        match self.device_type {
            0x00 => "Direct-access block (disk)",
            0x01 => "Sequential-access (tape)",
            0x03 => "Processor",
            0x05 => "CD/DVD",
            0x07 => "Optical memory",
            0x08 => "Medium changer",
            0x0C => "Storage array controller",
            0x0D => "Enclosure services",
            0x0E => "RBC",
            0x11 => "Object-based storage",
            _ => "Unknown/Reserved",
        }
    }
}

/// Parse a Standard INQUIRY (EVPD=0) response (minimum 36 bytes).
pub fn parse_inquiry_standard(buf: &[u8]) -> Result<InquiryStandard> {
    if buf.len() < 36 {
        bail!("INQUIRY buffer too short: {}", buf.len());
    }

    Ok(InquiryStandard {
        peripheral_qualifier: (buf[0] >> 5) & 0x07,
        device_type: buf[0] & 0x1F,
        rmb: (buf[1] & 0x80) != 0,
        version: buf[2],
        response_data_format: buf[3] & 0x0F,
        additional_length: buf[4],
        vendor_id: trim_ascii(&buf[8..16]),
        product_id: trim_ascii(&buf[16..32]),
        product_rev: trim_ascii(&buf[32..36]),
    })
}

fn trim_ascii(bytes: &[u8]) -> String {
    let s: String = bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect();
    s.trim().to_string()
}
