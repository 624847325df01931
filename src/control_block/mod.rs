// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use enum_dispatch::enum_dispatch;

/// Shared command-descriptor plumbing.
pub mod common;
/// INQUIRY(6).
pub mod inquiry;
/// READ CAPACITY(10).
pub mod read_capacity;
/// REPORT LUNS(12).
pub mod report_luns;
/// REQUEST SENSE(6).
pub mod request_sense;
/// TEST UNIT READY(6).
pub mod test_unit_ready;

pub use common::{CDB_LEN, Cdb, Disposition};

use crate::{
    device::{DeviceError, sg::SgDevice},
    models::{execution::CdbReply, sense::SenseSummary},
};

/// The commands this crate issues out of the box, unified for callers that
/// pick a command at runtime (the CLI, for one).
#[enum_dispatch(Cdb)]
#[derive(Debug, Clone, Copy)]
pub enum KnownCommand {
    TestUnitReady(test_unit_ready::TestUnitReady),
    StandardInquiry(inquiry::StandardInquiry),
    ReportLuns(report_luns::ReportLuns),
    ReadCapacity10(read_capacity::ReadCapacity10),
    RequestSense(request_sense::RequestSense),
}

impl KnownCommand {
    /// Parse a command name as given on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "tur" | "test-unit-ready" => {
                KnownCommand::TestUnitReady(test_unit_ready::TestUnitReady)
            },
            "inquiry" => {
                KnownCommand::StandardInquiry(inquiry::StandardInquiry::default())
            },
            "report-luns" => {
                KnownCommand::ReportLuns(report_luns::ReportLuns::default())
            },
            "read-capacity" => {
                KnownCommand::ReadCapacity10(read_capacity::ReadCapacity10)
            },
            "request-sense" => {
                KnownCommand::RequestSense(request_sense::RequestSense::default())
            },
            _ => return None,
        })
    }
}
