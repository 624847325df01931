// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{env, path::PathBuf};

use anyhow::{Context, Result, bail};
use scsi_exec_rs::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    control_block::KnownCommand,
    engine, rescan,
};
use tracing::info;

const USAGE: &str = "usage: scsi-exec-rs <device> \
                     <tur|inquiry|report-luns|read-capacity|request-sense> | \
                     scsi-exec-rs rescan";

fn main() -> Result<()> {
    let _logger_guard = init_logger("tests/config_logger.yaml")?;

    if let Ok(path) = resolve_config_path("tests/config.yaml") {
        Config::load_from_file(path)
            .context("failed to load config")?
            .install()?;
    }

    let mut args = env::args().skip(1);
    match (args.next(), args.next()) {
        (Some(word), None) if word == "rescan" => {
            rescan::initiate_rescan()?;
            rescan::settle::udev_settle()?;
            info!("rescan complete");
        },
        (Some(device), Some(command)) => {
            let device = PathBuf::from(device);
            let Some(cdb) = KnownCommand::from_name(&command) else {
                bail!("unknown command {command:?}\n{USAGE}");
            };
            let reply = engine::execute_cdb(&device, cdb)?;
            info!(command = %command, device = %device.display(), ?reply, "completed");
        },
        _ => bail!("{USAGE}"),
    }

    Ok(())
}
