//! Integration tests for the session lifecycle
//!
//! These tests validate the complete collection workflow:
//! - Discovery, subscription and teardown
//! - Record assembly from interleaved channels
//! - Drain and persistence at session end

mod common;

use common::builders::ScriptBuilder;
use common::mock_helpers::{
    create_generated_transport, create_scripted_transport, fast_settings, TEST_DEVICE,
};
use motionlog::backend::{MockTransport, MotionTransport};
use motionlog::config::PersistenceFormat;
use motionlog::session::{
    CancellationToken, RecordWriter, SessionController, SessionState, StopReason,
};
use motionlog::types::{Channel, Record};
use motionlog::MotionLogError;
use serial_test::serial;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn run_closing_script(script: Vec<(Uuid, Vec<u8>)>) -> motionlog::session::SessionOutcome {
    let transport = create_scripted_transport(script).closing_after_script();
    let mut controller = SessionController::new(transport, fast_settings(Duration::from_secs(30)));
    let outcome = controller.run(&CancellationToken::new()).unwrap();
    assert_eq!(outcome.metadata.stop_reason, StopReason::TransportClosed);
    outcome
}

#[test]
fn test_two_samples_in_order() {
    let script = ScriptBuilder::new()
        .sample(1000, 0.1, 0.2, 0.3)
        .sample(1500, 0.4, 0.5, 0.6)
        .build();

    let outcome = run_closing_script(script);
    assert_eq!(
        common::records(&outcome),
        vec![
            Record::new(1000, 0.1, 0.2, 0.3, 0.0),
            Record::new(1500, 0.4, 0.5, 0.6, 0.5),
        ]
    );
    assert_eq!(outcome.metadata.record_count, 2);
    assert_eq!(outcome.metadata.stats.records_completed, 2);
    assert_eq!(outcome.metadata.epoch_origin_ms, Some(1000));
    assert!(!outcome.metadata.stats.partial_discarded_at_end);
}

#[test]
fn test_dangling_partial_is_discarded() {
    let script = ScriptBuilder::new()
        .sample(1000, 0.1, 0.2, 0.3)
        .event(motionlog::RawChannelEvent::Timestamp(2000))
        .event(motionlog::RawChannelEvent::AxisX(0.9))
        .build();

    let outcome = run_closing_script(script);
    assert_eq!(outcome.series.len(), 1);
    assert_eq!(outcome.series.last().map(|r| r.raw_timestamp), Some(1000));
    assert!(outcome.metadata.stats.partial_discarded_at_end);
}

#[test]
fn test_malformed_and_stray_payloads_do_not_end_session() {
    let stray = Uuid::from_u128(0x1234);
    let script = ScriptBuilder::new()
        .sample(1000, 0.1, 0.2, 0.3)
        .raw(Channel::AxisY, &[0x00, 0x01, 0x02])
        .stray(stray, &[0u8; 4])
        .sample(1500, 0.4, 0.5, 0.6)
        .build();

    let outcome = run_closing_script(script);
    let stats = &outcome.metadata.stats;
    assert_eq!(outcome.series.len(), 2);
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(stats.unknown_channel_drops, 1);
    assert_eq!(stats.notifications_received, 10);
    assert_eq!(stats.dropped(), 2);
}

#[test]
fn test_empty_session_writes_no_file() {
    let outcome = run_closing_script(Vec::new());
    assert!(outcome.is_empty());
    assert_eq!(outcome.metadata.epoch_origin_ms, None);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("motion.csv");
    let err = RecordWriter::new(PersistenceFormat::Csv)
        .write(&outcome.series, &path)
        .unwrap_err();
    assert!(matches!(err, MotionLogError::EmptySession));
    assert!(!path.exists());
}

#[test]
fn test_session_output_round_trip_to_csv() {
    let script = ScriptBuilder::new()
        .sample(1000, 0.1, 0.2, 0.3)
        .sample(1500, 0.4, 0.5, 0.6)
        .build();
    let outcome = run_closing_script(script);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("motion.csv");
    let writer = RecordWriter::new(PersistenceFormat::Csv);
    writer.write(&outcome.series, &path).unwrap();
    let meta_path = writer.write_metadata(&outcome.metadata, &path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "Timestamp_ms,AccX,AccY,AccZ,Timestamp_sec\n1000,0.1,0.2,0.3,0.0\n1500,0.4,0.5,0.6,0.5\n"
    );

    let meta: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(meta_path).unwrap()).unwrap();
    assert_eq!(meta["device_name"], TEST_DEVICE);
    assert_eq!(meta["record_count"], 2);
}

#[test]
fn test_missing_device_creates_no_subscriptions() {
    let mut controller =
        SessionController::new(MockTransport::absent(), fast_settings(Duration::from_secs(1)));

    let err = controller.run(&CancellationToken::new()).unwrap_err();
    assert!(matches!(err, MotionLogError::DeviceNotFound(ref name) if name == TEST_DEVICE));

    let transport = controller.into_transport();
    assert!(transport.subscribe_history().is_empty());
    assert!(!transport.is_connected());
}

#[test]
#[serial]
fn test_cancellation_ends_session_before_deadline() {
    let transport = create_generated_transport(200);
    let delivered = transport.delivered_handle();
    let mut controller = SessionController::new(transport, fast_settings(Duration::from_secs(30)));

    let token = CancellationToken::new();
    let canceller = token.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        canceller.cancel();
    });

    let started = Instant::now();
    let outcome = controller.run(&token).unwrap();
    handle.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(outcome.metadata.stop_reason, StopReason::Cancelled);
    assert_eq!(controller.state(), SessionState::Finished);
    assert!(delivered.load(std::sync::atomic::Ordering::Relaxed) > 0);
    assert_eq!(
        outcome.metadata.stats.records_completed as usize,
        outcome.series.len()
    );
}

#[test]
#[serial]
fn test_generated_session_until_deadline() {
    let transport = create_generated_transport(100);
    let mut controller =
        SessionController::new(transport, fast_settings(Duration::from_millis(500)));

    let outcome = controller.run(&CancellationToken::new()).unwrap();
    assert_eq!(outcome.metadata.stop_reason, StopReason::DeadlineExpired);
    assert!(!outcome.is_empty());

    let origin = outcome.metadata.epoch_origin_ms.unwrap();
    assert!(outcome.series.iter().all(|r| r.raw_timestamp >= origin));
    common::assert_normalized_to_origin(&outcome);

    let transport = controller.into_transport();
    assert_eq!(transport.active_subscriptions(), 0);
    assert!(!transport.is_connected());
}

#[cfg(unix)]
#[test]
#[serial]
fn test_signal_cancels_session_and_keeps_records() {
    use motionlog::session::signals::SignalCancel;
    use signal_hook::consts::SIGUSR2;

    let transport = create_generated_transport(200);
    let mut controller = SessionController::new(transport, fast_settings(Duration::from_secs(30)));

    let token = CancellationToken::new();
    let _listener = SignalCancel::install(&[SIGUSR2], token.clone()).unwrap();
    let handle = thread::spawn(|| {
        thread::sleep(Duration::from_millis(300));
        signal_hook::low_level::raise(SIGUSR2).unwrap();
    });

    let started = Instant::now();
    let outcome = controller.run(&token).unwrap();
    handle.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(outcome.metadata.stop_reason, StopReason::Cancelled);
    assert!(!outcome.is_empty());
    common::assert_normalized_to_origin(&outcome);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("interrupted.csv");
    let rows = RecordWriter::new(PersistenceFormat::Csv)
        .write(&outcome.series, &path)
        .unwrap();
    assert_eq!(rows, outcome.series.len());
}

#[test]
fn test_controller_runs_consecutive_sessions() {
    let transport = create_scripted_transport(ScriptBuilder::new().sample(7000, 1.0, 2.0, 3.0).build())
        .closing_after_script();
    let mut controller = SessionController::new(transport, fast_settings(Duration::from_secs(30)));

    let first = controller.run(&CancellationToken::new()).unwrap();
    let second = controller.run(&CancellationToken::new()).unwrap();

    // Each session starts from a fresh epoch
    assert_eq!(first.series.len(), 1);
    assert_eq!(second.series.len(), 1);
    assert_eq!(second.series.first().map(|r| r.elapsed_seconds), Some(0.0));
    assert_eq!(second.metadata.epoch_origin_ms, Some(7000));
}
