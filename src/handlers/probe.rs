// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Typed wrappers for the probe commands rescan logic leans on.
//!
//! Each wrapper issues the command through the isolated engine and decodes
//! the raw data-in bytes on the parent side. A payload that fails to decode
//! degrades to [`CommandError::Failed`] — no partial result ever escapes.

use std::path::Path;

use tracing::error;

use crate::{
    control_block::{
        inquiry::{InquiryStandard, StandardInquiry, parse_inquiry_standard},
        read_capacity::{Capacity10, ReadCapacity10, parse_read_capacity10},
        report_luns::{ReportLuns, parse_report_luns},
        request_sense::RequestSense,
        test_unit_ready::TestUnitReady,
    },
    engine::{self, CommandError},
    models::{execution::CdbReply, sense::SenseData},
};

/// Whether the unit is ready for media-access commands. A unit that is
/// spun down, or does not implement the opcode, answers `false`.
pub fn test_unit_ready(device: &Path) -> Result<bool, CommandError> {
    match engine::execute_cdb(device, TestUnitReady)? {
        CdbReply::Flag(ready) => Ok(ready),
        other => unexpected_reply("TEST UNIT READY", &other),
    }
}

/// Standard INQUIRY data: vendor, product, revision, device type.
pub fn standard_inquiry(device: &Path) -> Result<InquiryStandard, CommandError> {
    let bytes = data_reply(engine::execute_cdb(device, StandardInquiry::default())?, "INQUIRY")?;
    parse_inquiry_standard(&bytes).map_err(|err| {
        error!(%err, "bad INQUIRY payload");
        CommandError::Failed
    })
}

/// Raw 8-byte LUN values visible behind the device (select report 0).
pub fn report_luns(device: &Path) -> Result<Vec<u64>, CommandError> {
    let bytes = data_reply(engine::execute_cdb(device, ReportLuns::default())?, "REPORT LUNS")?;
    parse_report_luns(&bytes).map_err(|err| {
        error!(%err, "bad REPORT LUNS payload");
        CommandError::Failed
    })
}

/// Device capacity as reported by READ CAPACITY(10).
pub fn read_capacity10(device: &Path) -> Result<Capacity10, CommandError> {
    let bytes =
        data_reply(engine::execute_cdb(device, ReadCapacity10)?, "READ CAPACITY(10)")?;
    parse_read_capacity10(&bytes).map_err(|err| {
        error!(%err, "bad READ CAPACITY(10) payload");
        CommandError::Failed
    })
}

/// Pending fixed-format sense data for the unit.
pub fn request_sense(device: &Path) -> Result<SenseData, CommandError> {
    let bytes =
        data_reply(engine::execute_cdb(device, RequestSense::default())?, "REQUEST SENSE")?;
    SenseData::parse(&bytes).map_err(|err| {
        error!(%err, "bad REQUEST SENSE payload");
        CommandError::Failed
    })
}

fn data_reply(reply: CdbReply, name: &str) -> Result<Vec<u8>, CommandError> {
    match reply {
        CdbReply::Data(bytes) => Ok(bytes),
        other => unexpected_reply(name, &other),
    }
}

fn unexpected_reply<T>(name: &str, reply: &CdbReply) -> Result<T, CommandError> {
    error!(command = name, ?reply, "unexpected reply shape");
    Err(CommandError::Failed)
}
