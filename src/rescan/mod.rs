//! This module drives the OS bus-rescan boundary: kernel control files,
//! the distribution rescan script, and partition-table refresh.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;
use tracing::info;

/// Bounded execution of external utilities.
pub mod settle;
/// Kernel control-file writers (`/proc/scsi/scsi`, sysfs).
pub mod sysfs;

use crate::cfg::config::Config;

/// Script names accepted for the bus rescan, in preference order. RedHat
/// ships the first, the debian scsitools package the second.
const RESCAN_SCRIPT_NAMES: [&str; 2] = ["rescan-scsi-bus", "rescan-scsi-bus.sh"];

/// Partition-table refresh tool, resolved through `PATH`.
const PARTPROBE: &str = "partprobe";

#[derive(Debug, Error)]
pub enum RescanError {
    /// Raised before any device I/O is attempted.
    #[error("rescan utility {utility} not found")]
    Missing { utility: String },
    #[error("failed to run {utility}: {source}")]
    Spawn {
        utility: String,
        source: std::io::Error,
    },
    #[error("{utility} did not finish within {timeout:?}")]
    Timeout { utility: String, timeout: Duration },
    #[error("{utility} exited with {status}")]
    Failed {
        utility: String,
        status: std::process::ExitStatus,
    },
}

/// Locate a rescan script on `PATH`.
pub fn locate_rescan_script() -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        for name in RESCAN_SCRIPT_NAMES {
            let candidate = dir.join(name);
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

pub fn is_rescan_script_available() -> bool {
    locate_rescan_script().is_some()
}

/// Re-enumerate attached devices, then refresh kernel partition tables.
///
/// The missing-script error fires before anything is touched; the calls
/// themselves have no structured result beyond success or failure.
pub fn initiate_rescan() -> Result<(), RescanError> {
    let script = locate_rescan_script().ok_or_else(|| RescanError::Missing {
        utility: RESCAN_SCRIPT_NAMES[0].to_string(),
    })?;
    let timeout = Config::global().rescan.utility_timeout;

    info!(script = %script.display(), "initiating bus rescan");
    settle::log_execute(script.as_os_str(), &["--remove"], timeout)?;
    settle::log_execute(PARTPROBE.as_ref(), &[], timeout)
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
