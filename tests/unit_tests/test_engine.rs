// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! End-to-end scenarios against the engine, driven by scripted command
//! descriptors over `/dev/null` (a descriptor is a caller-supplied
//! capability, so none of these touch a real SCSI device).

use std::{
    path::Path,
    thread,
    time::{Duration, Instant},
};

use scsi_exec_rs::{
    control_block::{Cdb, Disposition},
    device::{DeviceError, SgDevice},
    engine::{
        CommandError, execute_cdb_on,
        spawn::{ForkBackend, SpawnBackend, ThreadBackend},
    },
    models::{
        execution::CdbReply,
        sense::{AdditionalCode, SenseKey, SenseSummary},
    },
};
use serial_test::serial;

use crate::unit_tests::common::{TEST_TIMEOUT, ensure_test_config};

const DEV_NULL: &str = "/dev/null";

#[derive(Debug, Clone)]
enum Script {
    Reply(CdbReply),
    Hang,
    CheckCondition(SenseSummary),
    Panic,
    /// Kill the worker with no value written. Process backend only.
    ExitSilently,
}

#[derive(Debug, Clone)]
struct ScriptedCdb {
    script: Script,
    not_ready_is_benign: bool,
}

impl ScriptedCdb {
    fn new(script: Script) -> Self {
        Self { script, not_ready_is_benign: false }
    }
}

impl Cdb for ScriptedCdb {
    fn name(&self) -> &'static str {
        "SCRIPTED"
    }

    fn execute(&self, _device: &mut SgDevice) -> Result<CdbReply, DeviceError> {
        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Hang => loop {
                thread::sleep(Duration::from_secs(60));
            },
            Script::CheckCondition(sense) => Err(DeviceError::CheckCondition(*sense)),
            Script::Panic => panic!("scripted crash"),
            Script::ExitSilently => std::process::exit(7),
        }
    }

    fn on_check_condition(&self, sense: &SenseSummary) -> Disposition {
        if self.not_ready_is_benign && sense.key == SenseKey::NotReady {
            Disposition::Benign(CdbReply::Flag(false))
        } else {
            Disposition::Fatal
        }
    }
}

fn run(backend: &dyn SpawnBackend, script: Script) -> Result<CdbReply, CommandError> {
    execute_cdb_on(backend, Path::new(DEV_NULL), ScriptedCdb::new(script))
}

#[test]
#[serial]
fn immediate_reply_process_backend() {
    ensure_test_config();
    let got = run(&ForkBackend, Script::Reply(CdbReply::Data(vec![42]))).expect("WTF");
    assert_eq!(got, CdbReply::Data(vec![42]));
}

#[test]
#[serial]
fn immediate_reply_thread_backend() {
    ensure_test_config();
    let got = run(&ThreadBackend, Script::Reply(CdbReply::Flag(true))).expect("WTF");
    assert_eq!(got, CdbReply::Flag(true));
}

#[test]
#[serial]
fn hanging_descriptor_fails_within_deadline() {
    ensure_test_config();
    let started = Instant::now();
    let got = run(&ForkBackend, Script::Hang);
    let elapsed = started.elapsed();

    assert_eq!(got, Err(CommandError::Failed));
    assert!(elapsed >= TEST_TIMEOUT, "returned before the deadline: {elapsed:?}");
    // Deadline plus bounded kill/reap overhead.
    assert!(elapsed < TEST_TIMEOUT + Duration::from_secs(2), "took {elapsed:?}");
}

#[test]
#[serial]
fn hanging_descriptor_fails_on_thread_backend_too() {
    ensure_test_config();
    let got = run(&ThreadBackend, Script::Hang);
    assert_eq!(got, Err(CommandError::Failed));
}

#[test]
#[serial]
fn check_condition_reaches_caller_verbatim() {
    ensure_test_config();
    let sense = SenseSummary::new(SenseKey::IllegalRequest, 0x20, 0x00);
    let got = run(&ForkBackend, Script::CheckCondition(sense));
    assert_eq!(
        got,
        Err(CommandError::CheckCondition {
            sense_key: SenseKey::IllegalRequest,
            sense_code: AdditionalCode::new(0x20, 0x00),
        })
    );
}

#[test]
#[serial]
fn benign_check_condition_becomes_false() {
    ensure_test_config();
    let sense = SenseSummary::new(SenseKey::NotReady, 0x04, 0x01);
    let mut cdb = ScriptedCdb::new(Script::CheckCondition(sense));
    cdb.not_ready_is_benign = true;
    let got = execute_cdb_on(&ForkBackend, Path::new(DEV_NULL), cdb).expect("WTF");
    assert_eq!(got, CdbReply::Flag(false));
}

#[test]
#[serial]
fn silent_worker_death_fails_fast() {
    ensure_test_config();
    let started = Instant::now();
    let got = run(&ForkBackend, Script::ExitSilently);
    assert_eq!(got, Err(CommandError::Failed));
    // EOF detection, not the timeout, must end this call.
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
#[serial]
fn panicking_descriptor_degrades_to_failed() {
    ensure_test_config();
    let got = run(&ThreadBackend, Script::Panic);
    assert_eq!(got, Err(CommandError::Failed));
}

#[test]
#[serial]
fn unopenable_device_degrades_to_failed() {
    ensure_test_config();
    let got = execute_cdb_on(
        &ForkBackend,
        Path::new("/dev/definitely-not-a-device"),
        ScriptedCdb::new(Script::Reply(CdbReply::Unit)),
    );
    assert_eq!(got, Err(CommandError::Failed));
}

#[test]
#[serial]
fn real_descriptor_on_non_scsi_node_fails_cleanly() {
    ensure_test_config();
    // /dev/null opens fine but rejects SG_IO with ENOTTY; the worker must
    // turn that into the failure sentinel, not a crash or a hang.
    let started = Instant::now();
    let got = scsi_exec_rs::handlers::probe::test_unit_ready(Path::new(DEV_NULL));
    assert_eq!(got, Err(CommandError::Failed));
    assert!(started.elapsed() < TEST_TIMEOUT);
}

#[test]
#[serial]
fn concurrent_invocations_stay_independent() {
    ensure_test_config();
    let workers: Vec<_> = (0u8..4)
        .map(|i| {
            thread::spawn(move || {
                let got =
                    run(&ForkBackend, Script::Reply(CdbReply::Data(vec![i; 8])))
                        .expect("WTF");
                (i, got)
            })
        })
        .collect();

    for handle in workers {
        let (i, got) = handle.join().expect("WTF");
        assert_eq!(got, CdbReply::Data(vec![i; 8]));
    }
}
