// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use hex_literal::hex;
use scsi_exec_rs::models::sense::{AdditionalCode, SenseData, SenseKey, SenseSummary};

#[test]
fn parse_fixed_not_ready_becoming_ready() {
    // Fixed format, valid=1, key=NOT READY, asc/ascq=0x04/0x01.
    let buf = hex!("f0 00 02 00 00 00 00 0a 00 00 00 00 04 01 00 00 00 00");
    let sense = SenseData::parse(&buf).expect("WTF");

    assert_eq!(sense.key(), SenseKey::NotReady);
    assert_eq!(sense.additional_code(), AdditionalCode::new(0x04, 0x01));
    assert_eq!(
        sense.additional_code().describe(),
        Some("Logical unit is in process of becoming ready")
    );
    assert_eq!(
        sense.summary(),
        SenseSummary::new(SenseKey::NotReady, 0x04, 0x01)
    );
}

#[test]
fn parse_fixed_with_information_fields() {
    let buf = hex!("f0 00 03 12 34 56 78 0a de ad be ef 11 00 00 00 00 00");
    let sense = SenseData::parse(&buf).expect("WTF");

    assert!(sense.valid);
    assert_eq!(sense.response_code, 0x70);
    assert_eq!(sense.key(), SenseKey::MediumError);
    assert_eq!(sense.information, 0x1234_5678);
    assert_eq!(sense.cmd_specific, 0xDEAD_BEEF);
    assert_eq!(sense.additional_len, 0x0A);
}

#[test]
fn short_buffer_is_rejected() {
    let buf = hex!("f0 00 05 00 00 00 00 0a 00 00 00 00 20 00 00 00 00");
    assert!(SenseData::parse(&buf).is_err());
}

#[test]
fn additional_code_display_is_readable() {
    let code = AdditionalCode::new(0x20, 0x00);
    let text = code.to_string();
    assert!(text.contains("0x20"), "{text}");
    assert!(text.contains("Invalid command operation code"), "{text}");

    // Unlisted pairs still render.
    let vendor = AdditionalCode::new(0x80, 0x13);
    assert!(vendor.to_string().contains("vendor specific"));
}

#[test]
fn sense_key_mapping_covers_the_nibble() {
    assert_eq!(SenseKey::from(0x0), SenseKey::NoSense);
    assert_eq!(SenseKey::from(0x2), SenseKey::NotReady);
    assert_eq!(SenseKey::from(0x5), SenseKey::IllegalRequest);
    assert_eq!(SenseKey::from(0xB), SenseKey::AbortedCommand);
    assert_eq!(SenseKey::from(0xC), SenseKey::Reserved(0xC));
    for raw in 0u8..=0x0F {
        assert_eq!(u8::from(SenseKey::from(raw)), raw);
    }
}
