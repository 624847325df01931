// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Writers for the kernel's SCSI control files.
//!
//! These are fire-and-forget side effects: a write failure is logged and
//! reported as `false`, an absent control file counts as success (the kernel
//! simply has nothing to do for it).

use std::{fs, path::Path};

use tracing::{debug, error};

const PROC_SCSI_SCSI: &str = "/proc/scsi/scsi";

/// Write one line (newline appended) to a kernel control file.
pub fn write_control_line(path: &Path, line: &str) -> bool {
    match fs::write(path, format!("{line}\n")) {
        Ok(()) => true,
        Err(err) => {
            error!(path = %path.display(), %line, %err, "control file write failed");
            false
        },
    }
}

/// Ask the mid-layer to attach one device by its H:C:T:L address.
pub fn scsi_add_single_device(host: u32, channel: u32, target: u32, lun: u32) -> bool {
    write_control_line(
        Path::new(PROC_SCSI_SCSI),
        &format!("scsi add-single-device {host} {channel} {target} {lun}"),
    )
}

/// Ask the mid-layer to detach one device by its H:C:T:L address.
pub fn scsi_remove_single_device(host: u32, channel: u32, target: u32, lun: u32) -> bool {
    write_control_line(
        Path::new(PROC_SCSI_SCSI),
        &format!("scsi remove-single-device {host} {channel} {target} {lun}"),
    )
}

/// Trigger a wildcard scan on one SCSI host.
pub fn scsi_host_scan(host: u32) -> bool {
    let scan_file = format!("/sys/class/scsi_host/host{host}/scan");
    let scan_file = Path::new(&scan_file);
    if !scan_file.exists() {
        debug!(path = %scan_file.display(), "scan file does not exist");
        return true;
    }
    write_control_line(scan_file, "- - -")
}

/// Delete one device through its sysfs node.
pub fn remove_device_via_sysfs(host: u32, channel: u32, target: u32, lun: u32) -> bool {
    let delete_file =
        format!("/sys/class/scsi_device/{host}:{channel}:{target}:{lun}/device/delete");
    let delete_file = Path::new(&delete_file);
    if !delete_file.exists() {
        debug!(path = %delete_file.display(), "sysfs delete file does not exist");
        return true;
    }
    write_control_line(delete_file, "1")
}
