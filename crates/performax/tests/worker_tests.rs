//! Session worker thread tests
//!
//! Drive a mock-backed session through the async bridge the way the CLI does.

use common::test_utils::{DEFAULT_TEST_TIMEOUT, DriverCall, MockDriver, with_timeout};
use common::{
    DeviceSession, ErrorKind, PerformaxDriver, SessionState, create_session_bridge,
};
use performax::usb::spawn_session_worker;
use protocol::{Command, Timeouts, UsbError};

/// Driver whose exchanges panic
struct PanickingDriver;

impl PerformaxDriver for PanickingDriver {
    type Handle = ();

    fn device_count(&mut self) -> Result<u32, UsbError> {
        Ok(1)
    }

    fn open(&mut self, _index: u32) -> Result<(), UsbError> {
        Ok(())
    }

    fn set_timeouts(&mut self, _timeouts: Timeouts) -> Result<(), UsbError> {
        Ok(())
    }

    fn send_recv(
        &mut self,
        _handle: &mut (),
        _command: &[u8],
        _reply_capacity: usize,
    ) -> Result<Vec<u8>, UsbError> {
        panic!("driver fault");
    }

    fn flush(&mut self, _handle: &mut ()) -> Result<(), UsbError> {
        Ok(())
    }

    fn close(&mut self, _handle: ()) -> Result<(), UsbError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_connect_send_disconnect() {
    let driver = MockDriver::new().with_reply(b"OK");
    let calls = driver.calls();
    let (bridge, worker) = create_session_bridge();
    let handle = spawn_session_worker(worker, DeviceSession::new(driver)).unwrap();

    with_timeout(DEFAULT_TEST_TIMEOUT, async {
        assert_eq!(bridge.connect().await.unwrap(), 1);
        assert_eq!(bridge.state().await.unwrap(), SessionState::Connected);

        let reply = bridge.send_str("STATUS").await.unwrap();
        assert_eq!(reply.text(), "OK");

        bridge.disconnect().await.unwrap();
        assert_eq!(bridge.state().await.unwrap(), SessionState::Disconnected);
        bridge.shutdown().await.unwrap();
    })
    .await
    .unwrap();

    handle.join().unwrap();
    assert_eq!(calls.sent_commands(), vec!["STATUS".to_string()]);
    assert_eq!(calls.count(|c| *c == DriverCall::Close), 1);
}

#[tokio::test]
async fn test_send_before_connect_is_not_connected() {
    let (bridge, worker) = create_session_bridge();
    let handle = spawn_session_worker(worker, DeviceSession::new(MockDriver::new())).unwrap();

    let err = bridge.send_str("ID").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);

    bridge.shutdown().await.unwrap();
    handle.join().unwrap();
}

#[tokio::test]
async fn test_invalid_command_never_reaches_worker() {
    let driver = MockDriver::new();
    let calls = driver.calls();
    let (bridge, worker) = create_session_bridge();
    let handle = spawn_session_worker(worker, DeviceSession::new(driver)).unwrap();

    bridge.connect().await.unwrap();
    let err = bridge.send_str(&"X".repeat(64)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCommand);

    bridge.shutdown().await.unwrap();
    handle.join().unwrap();
    assert!(calls.sent_commands().is_empty());
}

#[tokio::test]
async fn test_concurrent_callers_are_serialized() {
    let driver = MockDriver::new().with_reply(b"OK");
    let calls = driver.calls();
    let (bridge, worker) = create_session_bridge();
    let handle = spawn_session_worker(worker, DeviceSession::new(driver)).unwrap();

    bridge.connect().await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let bridge = bridge.clone();
        tasks.push(tokio::spawn(async move {
            let command = Command::new(format!("PX{}", i)).unwrap();
            bridge.send(command).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().text(), "OK");
    }

    bridge.shutdown().await.unwrap();
    handle.join().unwrap();

    let mut sent = calls.sent_commands();
    sent.sort();
    let expected: Vec<String> = (0..8).map(|i| format!("PX{}", i)).collect();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn test_shutdown_disconnects_open_session() {
    let driver = MockDriver::new();
    let calls = driver.calls();
    let (bridge, worker) = create_session_bridge();
    let handle = spawn_session_worker(worker, DeviceSession::new(driver)).unwrap();

    bridge.connect().await.unwrap();
    bridge.shutdown().await.unwrap();
    handle.join().unwrap();

    assert_eq!(calls.count(|c| *c == DriverCall::Close), 1);
}

#[tokio::test]
async fn test_dropping_bridge_stops_worker() {
    let driver = MockDriver::new();
    let calls = driver.calls();
    let (bridge, worker) = create_session_bridge();
    let handle = spawn_session_worker(worker, DeviceSession::new(driver)).unwrap();

    bridge.connect().await.unwrap();
    drop(bridge);
    handle.join().unwrap();

    assert_eq!(calls.count(|c| *c == DriverCall::Close), 1);
}

#[tokio::test]
async fn test_transfer_failure_surfaces_as_send_recv() {
    let driver = MockDriver::new();
    driver.script().fail_send_recv(UsbError::Timeout);
    let (bridge, worker) = create_session_bridge();
    let handle = spawn_session_worker(worker, DeviceSession::new(driver)).unwrap();

    bridge.connect().await.unwrap();
    let err = bridge.send_str("PX").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SendRecv);
    assert!(err.to_string().contains("PX"));

    bridge.shutdown().await.unwrap();
    handle.join().unwrap();
}

#[tokio::test]
async fn test_worker_survives_panicking_command() {
    let (bridge, worker) = create_session_bridge();
    let handle = spawn_session_worker(worker, DeviceSession::new(PanickingDriver)).unwrap();

    bridge.connect().await.unwrap();
    let err = bridge.send_str("PX").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Channel);

    // Still serving commands
    assert_eq!(bridge.state().await.unwrap(), SessionState::Connected);

    bridge.shutdown().await.unwrap();
    handle.join().unwrap();
}
