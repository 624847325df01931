// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Bounded execution of rescan utilities, plus the udev settle step that
//! lets device nodes appear before anyone opens them.

use std::{
    ffi::OsStr,
    io::Read,
    path::Path,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::{cfg::config::Config, rescan::RescanError};

pub const UDEVADM: &str = "/sbin/udevadm";
pub const UDEVSETTLE: &str = "/sbin/udevsettle";

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn is_udevadm_available() -> bool {
    Path::new(UDEVADM).exists()
}

pub fn is_udevsettle_available() -> bool {
    Path::new(UDEVSETTLE).exists()
}

/// Wait for udev to finish processing queued events. Prefers `udevadm
/// settle`, falls back to the legacy `udevsettle`; a host with neither gets
/// the distinct missing-utility error without any device I/O.
pub fn udev_settle() -> Result<(), RescanError> {
    let timeout = Config::global().rescan.utility_timeout;
    if is_udevadm_available() {
        return log_execute(UDEVADM.as_ref(), &["settle"], timeout);
    }
    if is_udevsettle_available() {
        return log_execute(UDEVSETTLE.as_ref(), &[], timeout);
    }
    Err(RescanError::Missing { utility: "udevadm".to_string() })
}

/// Run a utility, log what it printed, and kill it at the deadline.
///
/// Success or failure of the invocation itself is the only structured
/// outcome these tools have.
pub fn log_execute(
    program: &OsStr,
    args: &[&str],
    timeout: Duration,
) -> Result<(), RescanError> {
    let utility = program.to_string_lossy().into_owned();
    debug!(%utility, ?args, "running rescan utility");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RescanError::Spawn { utility: utility.clone(), source })?;

    // Drain the pipes off-thread so a chatty utility cannot fill them and
    // wedge itself before the deadline check sees it.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                warn!(%utility, ?timeout, "utility deadline reached, killing it");
                kill_and_reap(&mut child);
                return Err(RescanError::Timeout { utility, timeout });
            },
            Ok(None) => thread::sleep(WAIT_POLL_INTERVAL),
            Err(source) => {
                kill_and_reap(&mut child);
                return Err(RescanError::Spawn { utility, source });
            },
        }
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    debug!(%utility, %status, %stdout, %stderr, "utility finished");

    if status.success() {
        Ok(())
    } else {
        Err(RescanError::Failed { utility, status })
    }
}

fn drain<R>(stream: Option<R>) -> thread::JoinHandle<String>
where R: Read + Send + 'static {
    thread::spawn(move || {
        let mut out = String::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_string(&mut out);
        }
        out
    })
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
