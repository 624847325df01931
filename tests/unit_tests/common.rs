// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use scsi_exec_rs::cfg::config::Config;

/// Engine tests share the process-wide configuration. Keep the command
/// timeout small so the deadline scenarios stay fast.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Install the test configuration; only the first caller wins, which is
/// fine because every engine test asks for the same one.
pub fn ensure_test_config() {
    let mut cfg = Config::default();
    cfg.engine.command_timeout = TEST_TIMEOUT;
    let _ = cfg.validate_and_normalize();
    let _ = cfg.install();
}
