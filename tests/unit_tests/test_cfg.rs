// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use scsi_exec_rs::{
    cfg::{
        config::Config,
        logger::{DiagSink, WorkerDiagnostics},
    },
    engine::spawn::BackendKind,
};

#[test]
fn defaults_are_sane() {
    let mut cfg = Config::default();
    cfg.validate_and_normalize().expect("WTF");

    assert_eq!(cfg.engine.command_timeout, Duration::from_secs(30));
    assert_eq!(cfg.engine.spawn_backend, BackendKind::Process);
    assert_eq!(cfg.engine.worker_diagnostics.sink, DiagSink::Discard);
    // Utilities get three times the single-command deadline.
    assert_eq!(cfg.rescan.utility_timeout, Duration::from_secs(90));
}

#[test]
fn yaml_roundtrip() {
    let yaml = r#"
engine:
  CommandTimeout: 5
  SpawnBackend: thread
  WorkerDiagnostics:
    Level: debug
    Sink: stderr
rescan:
  UtilityTimeout: 7
"#;
    let mut cfg: Config = serde_yaml::from_str(yaml).expect("WTF");
    cfg.validate_and_normalize().expect("WTF");

    assert_eq!(cfg.engine.command_timeout, Duration::from_secs(5));
    assert_eq!(cfg.engine.spawn_backend, BackendKind::Thread);
    assert_eq!(cfg.engine.worker_diagnostics.level, "debug");
    assert_eq!(cfg.engine.worker_diagnostics.sink, DiagSink::Stderr);
    // Explicit utility timeout survives normalization.
    assert_eq!(cfg.rescan.utility_timeout, Duration::from_secs(7));
}

#[test]
fn partial_yaml_falls_back_to_defaults() {
    let yaml = r#"
engine:
  CommandTimeout: 4
"#;
    let mut cfg: Config = serde_yaml::from_str(yaml).expect("WTF");
    cfg.validate_and_normalize().expect("WTF");

    assert_eq!(cfg.engine.command_timeout, Duration::from_secs(4));
    assert_eq!(cfg.engine.spawn_backend, BackendKind::Process);
    assert_eq!(cfg.rescan.utility_timeout, Duration::from_secs(12));
}

#[test]
fn zero_command_timeout_is_rejected() {
    let yaml = r#"
engine:
  CommandTimeout: 0
"#;
    let mut cfg: Config = serde_yaml::from_str(yaml).expect("WTF");
    assert!(cfg.validate_and_normalize().is_err());
}

#[test]
fn worker_diagnostics_default_is_quiet() {
    let diag = WorkerDiagnostics::default();
    assert_eq!(diag.level, "warn");
    assert_eq!(diag.sink, DiagSink::Discard);
    // Builds without touching global dispatch.
    let _subscriber = diag.subscriber();
}
