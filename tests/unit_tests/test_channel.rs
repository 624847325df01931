// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    thread,
    time::{Duration, Instant},
};

use scsi_exec_rs::{
    engine::channel::{RecvError, channel},
    models::execution::{CdbReply, ExecutionResult},
};

#[test]
fn roundtrip_single_value() {
    let (receiver, sender) = channel().expect("WTF");
    let value = ExecutionResult::Completed(CdbReply::Data(vec![0x42; 600]));
    sender.send(&value).expect("WTF");
    let got = receiver.recv_timeout(Duration::from_secs(1)).expect("WTF");
    assert_eq!(got, value);
}

#[test]
fn recv_times_out_when_nothing_arrives() {
    let (receiver, _sender) = channel().expect("WTF");
    let started = Instant::now();
    match receiver.recv_timeout(Duration::from_millis(200)) {
        Err(RecvError::Timeout(_)) => {},
        other => panic!("expected timeout, got {other:?}"),
    }
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "timeout overshot: {elapsed:?}");
}

#[test]
fn recv_reports_disconnect_on_dropped_sender() {
    let (receiver, sender) = channel().expect("WTF");
    drop(sender);
    let started = Instant::now();
    match receiver.recv_timeout(Duration::from_secs(5)) {
        Err(RecvError::Disconnected) => {},
        other => panic!("expected disconnect, got {other:?}"),
    }
    // EOF must be immediate, not deadline-bound.
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn recv_sees_value_sent_from_another_thread() {
    let (receiver, sender) = channel().expect("WTF");
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        sender.send(&ExecutionResult::Failed).expect("WTF");
    });
    let got = receiver.recv_timeout(Duration::from_secs(5)).expect("WTF");
    assert_eq!(got, ExecutionResult::Failed);
    handle.join().expect("WTF");
}

#[test]
fn check_condition_survives_the_wire() {
    use scsi_exec_rs::models::sense::{SenseKey, SenseSummary};

    let (receiver, sender) = channel().expect("WTF");
    let value =
        ExecutionResult::CheckCondition(SenseSummary::new(SenseKey::NotReady, 0x04, 0x01));
    sender.send(&value).expect("WTF");
    assert_eq!(receiver.recv_timeout(Duration::from_secs(1)).expect("WTF"), value);
}
