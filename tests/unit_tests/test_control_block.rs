// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use scsi_exec_rs::{
    control_block::{
        CDB_LEN, Disposition, KnownCommand,
        inquiry::build_inquiry_standard,
        read_capacity::{build_read_capacity10, parse_read_capacity10},
        report_luns::{build_report_luns, parse_report_luns, select_report},
        request_sense::build_request_sense,
        test_unit_ready::{TestUnitReady, build_test_unit_ready},
    },
    models::{
        execution::CdbReply,
        sense::{SenseKey, SenseSummary},
    },
};

use scsi_exec_rs::control_block::Cdb;

#[test]
fn tur_cdb_is_all_zero() {
    let mut cdb = [0xFFu8; CDB_LEN];
    build_test_unit_ready(&mut cdb, 0x00);
    assert_eq!(cdb, [0u8; CDB_LEN]);
}

#[test]
fn report_luns_cdb_layout() {
    let mut cdb = [0u8; CDB_LEN];
    build_report_luns(&mut cdb, select_report::ALL, 0x0001_0203, 0x04);
    assert_eq!(cdb[0], 0xA0);
    assert_eq!(cdb[1], 0x00);
    assert_eq!(cdb[2], 0x00);
    assert_eq!(&cdb[6..10], &[0x00, 0x01, 0x02, 0x03]);
    assert_eq!(cdb[11], 0x04);
}

#[test]
fn read_capacity10_cdb_layout() {
    let mut cdb = [0u8; CDB_LEN];
    build_read_capacity10(&mut cdb, 0x0A0B_0C0D, true, 0x00);
    assert_eq!(cdb[0], 0x25);
    assert_eq!(&cdb[2..6], &[0x0A, 0x0B, 0x0C, 0x0D]);
    assert_eq!(cdb[8], 0x01);
}

#[test]
fn request_sense_cdb_layout() {
    let mut cdb = [0u8; CDB_LEN];
    build_request_sense(&mut cdb, false, 32, 0x00);
    assert_eq!(&cdb[..6], &[0x03, 0x00, 0x00, 0x00, 32, 0x00]);

    build_request_sense(&mut cdb, true, 18, 0x00);
    assert_eq!(cdb[1], 0x01);
    assert_eq!(cdb[4], 18);
}

#[test]
fn inquiry_cdb_layout() {
    let mut cdb = [0u8; CDB_LEN];
    build_inquiry_standard(&mut cdb, 96, 0x00);
    assert_eq!(&cdb[..6], &[0x12, 0x00, 0x00, 0x00, 96, 0x00]);
}

#[test]
fn parse_report_luns_two_entries() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&16u32.to_be_bytes()); // two 8-byte entries
    buf.extend_from_slice(&[0u8; 4]); // reserved
    buf.extend_from_slice(&0x0001_0000_0000_0000u64.to_be_bytes());
    buf.extend_from_slice(&0x0002_0000_0000_0000u64.to_be_bytes());

    let luns = parse_report_luns(&buf).expect("WTF");
    assert_eq!(luns, vec![0x0001_0000_0000_0000, 0x0002_0000_0000_0000]);
}

#[test]
fn parse_report_luns_rejects_truncated_list() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&16u32.to_be_bytes());
    buf.extend_from_slice(&[0u8; 4]);
    buf.extend_from_slice(&[0u8; 8]); // only one of the two promised entries
    assert!(parse_report_luns(&buf).is_err());
}

#[test]
fn parse_read_capacity10_roundtrip() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0x0000_FFFFu32.to_be_bytes());
    buf.extend_from_slice(&512u32.to_be_bytes());

    let capacity = parse_read_capacity10(&buf).expect("WTF");
    assert_eq!(capacity.max_lba, 0xFFFF);
    assert_eq!(capacity.block_len, 512);
    assert_eq!(capacity.total_bytes(), 0x1_0000 * 512);
    assert!(!capacity.indicates_overflow());
}

#[test]
fn tur_benign_classification_table() {
    let tur = TestUnitReady;

    let not_ready = SenseSummary::new(SenseKey::NotReady, 0x04, 0x00);
    assert_eq!(
        tur.on_check_condition(&not_ready),
        Disposition::Benign(CdbReply::Flag(false))
    );

    // NOT READY is benign regardless of the additional code.
    let spinning_up = SenseSummary::new(SenseKey::NotReady, 0x04, 0x01);
    assert_eq!(
        tur.on_check_condition(&spinning_up),
        Disposition::Benign(CdbReply::Flag(false))
    );

    let invalid_opcode = SenseSummary::new(SenseKey::IllegalRequest, 0x20, 0x00);
    assert_eq!(
        tur.on_check_condition(&invalid_opcode),
        Disposition::Benign(CdbReply::Flag(false))
    );

    // Same key, different code: not benign.
    let invalid_field = SenseSummary::new(SenseKey::IllegalRequest, 0x24, 0x00);
    assert_eq!(tur.on_check_condition(&invalid_field), Disposition::Fatal);

    let medium_error = SenseSummary::new(SenseKey::MediumError, 0x03, 0x11);
    assert_eq!(tur.on_check_condition(&medium_error), Disposition::Fatal);
}

#[test]
fn known_command_names_resolve() {
    for name in ["tur", "test-unit-ready", "inquiry", "report-luns", "read-capacity", "request-sense"] {
        assert!(KnownCommand::from_name(name).is_some(), "{name}");
    }
    assert!(KnownCommand::from_name("format-unit").is_none());
}
