// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow, ensure};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::{cfg::logger::WorkerDiagnostics, engine::spawn::BackendKind};

/// Hard deadline for one command round-trip when nothing is configured.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

static GLOBAL: OnceCell<Config> = OnceCell::new();

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Config {
    /// Worker-isolation and timeout policy for the execution engine.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Deadlines for the OS rescan utilities.
    #[serde(default)]
    pub rescan: RescanConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    #[serde(rename = "CommandTimeout", with = "serde_secs", default = "default_command_timeout")]
    /// Deadline for one command round-trip. A single constant shared by
    /// every invocation; there is deliberately no per-call override.
    pub command_timeout: Duration,

    #[serde(rename = "SpawnBackend", default)]
    /// Worker isolation backend. `process` carries the kill guarantee;
    /// `thread` trades it for spawn cost.
    pub spawn_backend: BackendKind,

    #[serde(rename = "WorkerDiagnostics", default)]
    /// Diagnostic sink installed inside each worker.
    pub worker_diagnostics: WorkerDiagnostics,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            spawn_backend: BackendKind::default(),
            worker_diagnostics: WorkerDiagnostics::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RescanConfig {
    #[serde(rename = "UtilityTimeout", with = "serde_secs", default)]
    /// Deadline for rescan utilities (script, partprobe, udev settle).
    /// Zero means "derive from the command timeout".
    pub utility_timeout: Duration,
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.engine.command_timeout.is_zero(),
            "CommandTimeout must be positive"
        );

        // Utilities batch many device round-trips, so they get three times
        // the single-command deadline unless configured explicitly.
        if self.rescan.utility_timeout.is_zero() {
            self.rescan.utility_timeout = self.engine.command_timeout * 3;
        }

        Ok(())
    }

    /// Install the process-wide configuration. Must happen before the first
    /// command is dispatched; a second install is an error.
    pub fn install(self) -> Result<()> {
        GLOBAL
            .set(self)
            .map_err(|_| anyhow!("configuration already installed"))
    }

    /// Process-wide configuration; defaults apply when nothing was
    /// installed.
    pub fn global() -> &'static Config {
        GLOBAL.get_or_init(|| {
            let mut cfg = Config::default();
            // Defaults always normalize cleanly.
            let _ = cfg.validate_and_normalize();
            cfg
        })
    }
}

fn default_command_timeout() -> Duration {
    DEFAULT_COMMAND_TIMEOUT
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
