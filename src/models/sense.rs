use std::fmt;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Sense data must be ≥ 18 bytes for fixed format.
pub const FIXED_MIN_LEN: usize = 18;

/// SPC-4 sense keys (low nibble of byte 2), including reserved values.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenseKey {
    NoSense,        // 0x0
    RecoveredError, // 0x1
    NotReady,       // 0x2
    MediumError,    // 0x3
    HardwareError,  // 0x4
    IllegalRequest, // 0x5
    UnitAttention,  // 0x6
    DataProtect,    // 0x7
    BlankCheck,     // 0x8
    VendorSpecific, // 0x9
    CopyAborted,    // 0xA
    AbortedCommand, // 0xB
    VolumeOverflow, // 0xD
    Miscompare,     // 0xE
    Completed,      // 0xF
    Reserved(u8),
}

impl From<u8> for SenseKey {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => SenseKey::NoSense,
            0x1 => SenseKey::RecoveredError,
            0x2 => SenseKey::NotReady,
            0x3 => SenseKey::MediumError,
            0x4 => SenseKey::HardwareError,
            0x5 => SenseKey::IllegalRequest,
            0x6 => SenseKey::UnitAttention,
            0x7 => SenseKey::DataProtect,
            0x8 => SenseKey::BlankCheck,
            0x9 => SenseKey::VendorSpecific,
            0xA => SenseKey::CopyAborted,
            0xB => SenseKey::AbortedCommand,
            0xD => SenseKey::VolumeOverflow,
            0xE => SenseKey::Miscompare,
            0xF => SenseKey::Completed,
            r => SenseKey::Reserved(r),
        }
    }
}

impl From<SenseKey> for u8 {
    fn from(value: SenseKey) -> Self {
        match value {
            SenseKey::NoSense => 0x0,
            SenseKey::RecoveredError => 0x1,
            SenseKey::NotReady => 0x2,
            SenseKey::MediumError => 0x3,
            SenseKey::HardwareError => 0x4,
            SenseKey::IllegalRequest => 0x5,
            SenseKey::UnitAttention => 0x6,
            SenseKey::DataProtect => 0x7,
            SenseKey::BlankCheck => 0x8,
            SenseKey::VendorSpecific => 0x9,
            SenseKey::CopyAborted => 0xA,
            SenseKey::AbortedCommand => 0xB,
            SenseKey::VolumeOverflow => 0xD,
            SenseKey::Miscompare => 0xE,
            SenseKey::Completed => 0xF,
            SenseKey::Reserved(r) => r & 0x0F,
        }
    }
}

impl fmt::Debug for SenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SenseKey::NoSense => write!(f, "NO SENSE"),
            SenseKey::RecoveredError => write!(f, "RECOVERED ERROR"),
            SenseKey::NotReady => write!(f, "NOT READY"),
            SenseKey::MediumError => write!(f, "MEDIUM ERROR"),
            SenseKey::HardwareError => write!(f, "HARDWARE ERROR"),
            SenseKey::IllegalRequest => write!(f, "ILLEGAL REQUEST"),
            SenseKey::UnitAttention => write!(f, "UNIT ATTENTION"),
            SenseKey::DataProtect => write!(f, "DATA PROTECT"),
            SenseKey::BlankCheck => write!(f, "BLANK CHECK"),
            SenseKey::VendorSpecific => write!(f, "VENDOR SPECIFIC"),
            SenseKey::CopyAborted => write!(f, "COPY ABORTED"),
            SenseKey::AbortedCommand => write!(f, "ABORTED COMMAND"),
            SenseKey::VolumeOverflow => write!(f, "VOLUME OVERFLOW"),
            SenseKey::Miscompare => write!(f, "MISCOMPARE"),
            SenseKey::Completed => write!(f, "COMPLETED"),
            SenseKey::Reserved(r) => write!(f, "RESERVED({r:#03x})"),
        }
    }
}

/// Additional Sense Code / Qualifier pair, the "sense code" beneath a key.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalCode {
    pub asc: u8,
    pub ascq: u8,
}

impl AdditionalCode {
    pub fn new(asc: u8, ascq: u8) -> Self {
        Self { asc, ascq }
    }

    /// SPC-4 description for this pair, if the pair is in the table.
    pub fn describe(&self) -> Option<&'static str> {
        hot_table(self.asc, self.ascq)
    }
}

impl fmt::Debug for AdditionalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}/{:#04x}", self.asc, self.ascq)
    }
}

impl fmt::Display for AdditionalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#04x}/{:#04x} ({})",
            self.asc,
            self.ascq,
            self.describe().unwrap_or("UNSPECIFIED / vendor specific")
        )
    }
}

fn hot_table(asc: u8, ascq: u8) -> Option<&'static str> {
    Some(match (asc, ascq) {
        (0x00, 0x00) => "No additional sense information",
        (0x02, 0x04) => "Not ready – LUN not ready, format in progress",
        (0x03, 0x11) => "Medium error – unrecovered read error",
        (0x04, 0x00) => "Logical unit not ready, cause not reportable",
        (0x04, 0x01) => "Logical unit is in process of becoming ready",
        (0x04, 0x02) => "Logical unit not ready, initializing command required",
        (0x05, 0x20) => "Illegal request – invalid command information field",
        (0x20, 0x00) => "Invalid command operation code",
        (0x24, 0x00) => "Illegal request – invalid field in CDB",
        (0x25, 0x00) => "Illegal request – logical unit not supported",
        (0x29, 0x00) => "Power on, reset, or bus device reset occurred",
        (0x3A, 0x00) => "Medium not present",
        (0x40, 0x00) => "Data integrity error",
        _ => return None,
    })
}

/// The (key, code) triple a worker reports for a check condition. Carried
/// verbatim from the device to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseSummary {
    pub key: SenseKey,
    pub code: AdditionalCode,
}

impl SenseSummary {
    pub fn new(key: SenseKey, asc: u8, ascq: u8) -> Self {
        Self { key, code: AdditionalCode::new(asc, ascq) }
    }
}

impl fmt::Display for SenseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.key, self.code)
    }
}

/// SPC-4 Table 43 — Fixed format sense-data byte layout
#[repr(C)]
#[derive(Default, PartialEq)]
pub struct SenseData {
    pub valid: bool,        // bit7 of byte0
    pub response_code: u8,  // low-7 bits of byte0
    pub sense_key: u8,      // low-4 bits of byte2
    pub ili: bool,          // bit5 of byte2
    pub eom: bool,          // bit6 of byte2
    pub filemark: bool,     // bit7 of byte2
    pub information: u32,   // bytes 3-6
    pub additional_len: u8, // byte7
    pub cmd_specific: u32,  // bytes 8-11
    pub asc: u8,            // byte12
    pub ascq: u8,           /* byte13 -- the remaining bytes (fru, sks…)
                             * are rarely used; add when needed */
}

impl SenseData {
    /// Parse *fixed-format* sense-data (SPC-4 § 4.5.3).
    ///
    /// The buffer must be at least 18 bytes long.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < FIXED_MIN_LEN {
            return Err(anyhow!(
                "sense buffer too small: {} < {FIXED_MIN_LEN}",
                buf.len()
            ));
        }

        Ok(Self {
            valid: buf[0] & 0x80 != 0,
            response_code: buf[0] & 0x7F,
            filemark: buf[2] & 0x80 != 0,
            eom: buf[2] & 0x40 != 0,
            ili: buf[2] & 0x20 != 0,
            sense_key: buf[2] & 0x0F,
            information: be_u32(buf, 3).context("Information field (bytes 3‥6)")?,
            additional_len: buf[7],
            cmd_specific: be_u32(buf, 8).context("Cmd-specific field (bytes 8‥11)")?,
            asc: buf[12],
            ascq: buf[13],
        })
    }

    #[inline]
    pub fn key(&self) -> SenseKey {
        SenseKey::from(self.sense_key)
    }

    #[inline]
    pub fn additional_code(&self) -> AdditionalCode {
        AdditionalCode::new(self.asc, self.ascq)
    }

    /// The triple carried over the worker channel.
    #[inline]
    pub fn summary(&self) -> SenseSummary {
        SenseSummary { key: self.key(), code: self.additional_code() }
    }
}

fn be_u32(buf: &[u8], offset: usize) -> Result<u32> {
    Ok(u32::from_be_bytes(buf[offset..offset + 4].try_into()?))
}

impl fmt::Debug for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenseData")
            .field("valid", &self.valid)
            .field(
                "response_code",
                &format_args!("{:#04x}", self.response_code),
            )
            .field("sense_key", &self.key())
            .field("filemark", &self.filemark)
            .field("eom", &self.eom)
            .field("ili", &self.ili)
            .field("information", &self.information)
            .field("additional_len", &self.additional_len)
            .field("cmd_specific", &self.cmd_specific)
            .field("code", &format_args!("{}", self.additional_code()))
            .finish()
    }
}
