//! Device session integration tests
//!
//! Exercises the session lifecycle against the scripted driver.
//!
//! # Test Scenarios
//! - Connect/send/disconnect happy path
//! - Enumeration, open and timeout failures (including cleanup)
//! - Command length enforcement
//! - Use before connect and after disconnect
//!
//! Run with: `cargo test -p common --test session_tests`

use common::test_utils::{DriverCall, MockDriver};
use common::{DeviceSession, ErrorKind, SessionState};
use protocol::{COMMAND_CAPACITY, Command, REPLY_CAPACITY, UsbError};

fn connected_session(driver: MockDriver) -> DeviceSession<MockDriver> {
    let mut session = DeviceSession::new(driver);
    session.connect().expect("connect failed");
    session
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_status_scenario() {
    let driver = MockDriver::new().with_reply(b"OK");
    let calls = driver.calls();
    let mut session = DeviceSession::new(driver);

    assert_eq!(session.connect().unwrap(), 1);
    assert_eq!(session.state(), SessionState::Connected);

    let reply = session.send_str("STATUS").unwrap();
    assert_eq!(reply.text(), "OK");
    assert_eq!(session.reply().text(), "OK");

    session.disconnect().unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);

    assert_eq!(calls.sent_commands(), vec!["STATUS"]);
    assert_eq!(calls.snapshot().last(), Some(&DriverCall::Close));
}

#[test]
fn test_connect_reports_device_count() {
    let mut session = DeviceSession::new(MockDriver::new().with_device_count(3));
    assert_eq!(session.connect().unwrap(), 3);
}

#[test]
fn test_reconnect_after_disconnect() {
    let driver = MockDriver::new();
    let calls = driver.calls();
    let mut session = connected_session(driver);
    session.disconnect().unwrap();
    session.connect().unwrap();
    assert!(session.is_connected());
    assert_eq!(calls.count(|c| matches!(c, DriverCall::Open(0))), 2);
}

// ============================================================================
// Connect Failures
// ============================================================================

#[test]
fn test_zero_devices_fails_without_open() {
    let driver = MockDriver::new().with_device_count(0);
    let calls = driver.calls();
    let mut session = DeviceSession::new(driver);

    let err = session.connect().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Enumeration);
    assert_eq!(calls.snapshot(), vec![DriverCall::DeviceCount]);
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn test_enumeration_failure_then_send_is_not_connected() {
    let driver = MockDriver::new();
    driver.script().fail_enumeration(UsbError::Access);
    let calls = driver.calls();
    let mut session = DeviceSession::new(driver);

    assert_eq!(session.connect().unwrap_err().kind(), ErrorKind::Enumeration);

    let err = session.send_str("STATUS").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
    assert_eq!(calls.count(|c| matches!(c, DriverCall::SendRecv(_))), 0);
}

#[test]
fn test_open_failure_skips_timeouts() {
    let driver = MockDriver::new();
    driver.script().fail_open(UsbError::Busy);
    let calls = driver.calls();
    let mut session = DeviceSession::new(driver);

    let err = session.connect().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Open);
    assert_eq!(
        calls.snapshot(),
        vec![DriverCall::DeviceCount, DriverCall::Open(0)]
    );
}

#[test]
fn test_timeout_failure_closes_handle() {
    let driver = MockDriver::new();
    driver.script().fail_set_timeouts(UsbError::InvalidParam);
    let calls = driver.calls();
    let mut session = DeviceSession::new(driver);

    let err = session.connect().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TimeoutConfig);
    assert!(!session.is_connected());
    assert_eq!(calls.snapshot().last(), Some(&DriverCall::Close));
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_oversized_command_rejected_before_transfer() {
    let driver = MockDriver::new();
    let calls = driver.calls();
    let mut session = connected_session(driver);

    let err = session
        .send_str(&"A".repeat(COMMAND_CAPACITY))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCommand);
    assert!(err.to_string().contains("Oversized command"));
    assert_eq!(calls.count(|c| matches!(c, DriverCall::SendRecv(_))), 0);
}

#[test]
fn test_longest_command_is_sent() {
    let driver = MockDriver::new();
    let calls = driver.calls();
    let mut session = connected_session(driver);

    let text = "B".repeat(COMMAND_CAPACITY - 1);
    session.send_str(&text).unwrap();
    assert_eq!(calls.sent_commands(), vec![text]);
}

#[test]
fn test_packet_is_full_buffer() {
    let driver = MockDriver::new();
    let calls = driver.calls();
    let mut session = connected_session(driver);

    session.send(&Command::new("MST").unwrap()).unwrap();
    let packet = calls
        .snapshot()
        .into_iter()
        .find_map(|c| match c {
            DriverCall::SendRecv(p) => Some(p),
            _ => None,
        })
        .unwrap();
    assert_eq!(packet.len(), COMMAND_CAPACITY);
    assert_eq!(&packet[..4], b"MST\0");
}

#[test]
fn test_reply_is_exact_driver_bytes() {
    let raw = b"12345\0\xff\x01";
    let mut session = connected_session(MockDriver::new().with_reply(raw));

    session.send_str("PX").unwrap();
    assert_eq!(session.reply().as_bytes(), raw);
    assert_eq!(session.reply().text(), "12345");
}

#[test]
fn test_reply_truncated_at_capacity() {
    let raw = vec![b'9'; REPLY_CAPACITY + 16];
    let mut session = connected_session(MockDriver::new().with_reply(&raw));

    let reply = session.send_str("EX").unwrap();
    assert_eq!(reply.len(), REPLY_CAPACITY);
    assert_eq!(reply.as_bytes(), &raw[..REPLY_CAPACITY]);
}

#[test]
fn test_reply_overwritten_by_each_command() {
    let driver = MockDriver::new().with_replies([b"0".as_slice(), b"1500".as_slice()]);
    let mut session = connected_session(driver);

    session.send_str("MST").unwrap();
    assert_eq!(session.reply().text(), "0");
    session.send_str("PX").unwrap();
    assert_eq!(session.reply().text(), "1500");
    assert_eq!(session.last_command().unwrap().as_str(), "PX");
}

#[test]
fn test_send_recv_failure_kind() {
    let driver = MockDriver::new();
    let script = driver.script();
    let mut session = connected_session(driver);

    script.fail_send_recv(UsbError::Timeout);
    let err = session.send_str("X1000").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SendRecv);
    assert!(session.is_connected());

    script.clear_send_recv_failure();
    assert!(session.send_str("X1000").is_ok());
}

// ============================================================================
// Flush & Disconnect
// ============================================================================

#[test]
fn test_flush_requires_connection() {
    let mut session = DeviceSession::new(MockDriver::new());
    assert_eq!(session.flush().unwrap_err().kind(), ErrorKind::NotConnected);

    session.connect().unwrap();
    session.flush().unwrap();
}

#[test]
fn test_flush_failure_kind() {
    let driver = MockDriver::new();
    driver.script().fail_flush_times(1);
    let mut session = connected_session(driver);

    assert_eq!(session.flush().unwrap_err().kind(), ErrorKind::Flush);
    assert!(session.flush().is_ok());
}

#[test]
fn test_disconnect_never_connected() {
    let driver = MockDriver::new();
    let calls = driver.calls();
    let mut session = DeviceSession::new(driver);

    let err = session.disconnect().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
    assert!(calls.is_empty());
}

#[test]
fn test_send_after_disconnect_is_rejected() {
    let driver = MockDriver::new();
    let calls = driver.calls();
    let mut session = connected_session(driver);
    session.disconnect().unwrap();

    assert_eq!(
        session.send_str("ID").unwrap_err().kind(),
        ErrorKind::NotConnected
    );
    assert_eq!(
        session.disconnect().unwrap_err().kind(),
        ErrorKind::NotConnected
    );
    assert_eq!(calls.count(|c| matches!(c, DriverCall::Close)), 1);
}

#[test]
fn test_close_failure_still_invalidates_handle() {
    let driver = MockDriver::new();
    let script = driver.script();
    let calls = driver.calls();
    let mut session = connected_session(driver);

    script.fail_close(UsbError::NoDevice);
    assert_eq!(session.disconnect().unwrap_err().kind(), ErrorKind::Close);
    assert_eq!(session.state(), SessionState::Disconnected);

    drop(session);
    // Drop must not close the handle a second time
    assert_eq!(calls.count(|c| matches!(c, DriverCall::Close)), 1);
}
