// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scoped handle over a Linux `SG_IO`-capable device node.
//!
//! The handle lives entirely inside a worker: it is opened after the worker
//! starts and the `File` drop (or the worker's death) closes it, so no handle
//! ever crosses a process boundary.

use std::{
    ffi::c_void,
    fs::{File, OpenOptions},
    os::{fd::AsRawFd, unix::fs::OpenOptionsExt},
    path::{Path, PathBuf},
    ptr,
    time::Duration,
};

use nix::{errno::Errno, libc};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    cfg::config::Config,
    models::{sense::{SenseData, SenseSummary}, status::ScsiStatus},
};

/// `SG_IO` ioctl request number (scsi/sg.h).
const SG_IO_REQUEST: libc::c_ulong = 0x2285;
/// `interface_id` is always ASCII `'S'` for the sg v3 interface.
const SG_INTERFACE_ID: i32 = b'S' as i32;
/// Room for fixed-format sense plus a few descriptor bytes.
const SENSE_BUF_LEN: usize = 32;
/// Driver set a valid sense buffer (DRIVER_SENSE in sg driver terms).
const DRIVER_SENSE: u16 = 0x08;

nix::ioctl_readwrite_bad!(sg_io_ioctl, SG_IO_REQUEST, SgIoHdr);

bitflags::bitflags! {
    /// Flags reported back in `sg_io_hdr.info`.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct SgInfo: u32 {
        /// 1 = something did not go right with this request.
        const CHECK     = 0x1;
        const DIRECT_IO = 0x2;
        const MIXED_IO  = 0x4;
    }
}

/// Data phase of one request, from the initiator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    None,
    ToDevice,
    FromDevice,
}

impl DataDirection {
    fn as_raw(self) -> i32 {
        // SG_DXFER_* constants from scsi/sg.h.
        match self {
            DataDirection::None => -1,
            DataDirection::ToDevice => -2,
            DataDirection::FromDevice => -3,
        }
    }
}

/// Everything that can go wrong below the engine, at the device boundary.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("SG_IO failed on {path}: {source}")]
    Ioctl { path: PathBuf, source: Errno },
    #[error("device reported check condition: {0}")]
    CheckCondition(SenseSummary),
    #[error("transport error: host_status={host:#06x} driver_status={driver:#06x}")]
    Transport { host: u16, driver: u16 },
    #[error("unexpected SCSI status {0:?}")]
    Status(ScsiStatus),
    #[error("malformed sense data: {0}")]
    Sense(String),
}

/// sg v3 request header (scsi/sg.h `sg_io_hdr_t`).
#[repr(C)]
#[allow(dead_code)]
struct SgIoHdr {
    interface_id: i32,
    dxfer_direction: i32,
    cmd_len: u8,
    mx_sb_len: u8,
    iovec_count: u16,
    dxfer_len: u32,
    dxferp: *mut c_void,
    cmdp: *mut u8,
    sbp: *mut u8,
    timeout: u32, // milliseconds
    flags: u32,
    pack_id: i32,
    usr_ptr: *mut c_void,
    status: u8,
    masked_status: u8,
    msg_status: u8,
    sb_len_wr: u8,
    host_status: u16,
    driver_status: u16,
    resid: i32,
    duration: u32, // milliseconds
    info: u32,
}

impl Default for SgIoHdr {
    fn default() -> Self {
        Self {
            interface_id: SG_INTERFACE_ID,
            dxfer_direction: DataDirection::None.as_raw(),
            cmd_len: 0,
            mx_sb_len: 0,
            iovec_count: 0,
            dxfer_len: 0,
            dxferp: ptr::null_mut(),
            cmdp: ptr::null_mut(),
            sbp: ptr::null_mut(),
            timeout: 0,
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        }
    }
}

/// An open command channel to one device.
pub struct SgDevice {
    path: PathBuf,
    file: File,
    io_timeout: Duration,
}

impl SgDevice {
    /// Open `path` for command traffic. `O_NONBLOCK` keeps the open itself
    /// from stalling on devices that are mid-reset; `SG_IO` requests are
    /// unaffected by it.
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| DeviceError::Open { path: path.to_path_buf(), source })?;
        debug!(device = %path.display(), "opened device handle");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            io_timeout: Config::global().engine.command_timeout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Issue one CDB. `data` is the data-in or data-out buffer depending on
    /// `direction`; returns the number of bytes actually transferred.
    pub fn issue(
        &mut self,
        cdb: &[u8],
        direction: DataDirection,
        data: &mut [u8],
    ) -> Result<usize, DeviceError> {
        let mut sense = [0u8; SENSE_BUF_LEN];
        let mut hdr = SgIoHdr {
            dxfer_direction: direction.as_raw(),
            cmd_len: cdb.len() as u8,
            mx_sb_len: sense.len() as u8,
            dxfer_len: data.len() as u32,
            dxferp: if data.is_empty() {
                ptr::null_mut()
            } else {
                data.as_mut_ptr().cast()
            },
            cmdp: cdb.as_ptr().cast_mut(),
            sbp: sense.as_mut_ptr(),
            timeout: self.io_timeout.as_millis().min(u32::MAX as u128) as u32,
            ..SgIoHdr::default()
        };

        trace!(device = %self.path.display(), cdb = %hex::encode(cdb), "SG_IO");
        // SAFETY: hdr and all buffers it points to outlive the ioctl call.
        unsafe { sg_io_ioctl(self.file.as_raw_fd(), &mut hdr) }
            .map_err(|source| DeviceError::Ioctl { path: self.path.clone(), source })?;

        decode_response(&hdr, &sense, data.len())
    }
}

fn decode_response(
    hdr: &SgIoHdr,
    sense: &[u8],
    data_len: usize,
) -> Result<usize, DeviceError> {
    let status = ScsiStatus::from(hdr.status);
    let info = SgInfo::from_bits_truncate(hdr.info);

    if !info.contains(SgInfo::CHECK) && status == ScsiStatus::Good {
        let resid = hdr.resid.max(0) as usize;
        debug!(duration_ms = hdr.duration, transferred = data_len.saturating_sub(resid), "SG_IO completed");
        return Ok(data_len.saturating_sub(resid));
    }

    if status == ScsiStatus::CheckCondition {
        let sense_written = (hdr.sb_len_wr as usize).min(sense.len());
        if sense_written > 0 || hdr.driver_status & DRIVER_SENSE != 0 {
            let parsed = SenseData::parse(&sense[..sense_written])
                .map_err(|err| DeviceError::Sense(err.to_string()))?;
            return Err(DeviceError::CheckCondition(parsed.summary()));
        }
        return Err(DeviceError::Status(status));
    }

    if hdr.host_status != 0 || hdr.driver_status & !DRIVER_SENSE != 0 {
        return Err(DeviceError::Transport {
            host: hdr.host_status,
            driver: hdr.driver_status,
        });
    }

    Err(DeviceError::Status(status))
}
