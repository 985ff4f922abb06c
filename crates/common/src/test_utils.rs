//! Test utilities for performax-usb
//!
//! Provides a scripted [`PerformaxDriver`] and helper functions for testing
//! sessions, the worker thread and the startup routine without hardware.
//!
//! # Example
//!
//! ```
//! use common::DeviceSession;
//! use common::test_utils::MockDriver;
//!
//! let mut session = DeviceSession::new(MockDriver::new().with_reply(b"OK"));
//! session.connect().unwrap();
//! assert_eq!(session.send_str("STATUS").unwrap().text(), "OK");
//! ```

use crate::driver::PerformaxDriver;
use protocol::{Timeouts, UsbError};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One call made against a [`MockDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    DeviceCount,
    Open(u32),
    SetTimeouts(Timeouts),
    /// Full packet as handed to the driver
    SendRecv(Vec<u8>),
    Flush,
    Close,
}

/// Shared record of driver calls, readable after the driver has been moved
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<DriverCall>>>);

impl CallLog {
    fn push(&self, call: DriverCall) {
        self.0.lock().expect("call log poisoned").push(call);
    }

    pub fn snapshot(&self) -> Vec<DriverCall> {
        self.0.lock().expect("call log poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().expect("call log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of calls matching `pred`
    pub fn count(&self, pred: impl Fn(&DriverCall) -> bool) -> usize {
        self.0
            .lock()
            .expect("call log poisoned")
            .iter()
            .filter(|c| pred(c))
            .count()
    }

    /// Command text of every packet sent, in order
    pub fn sent_commands(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter_map(|call| match call {
                DriverCall::SendRecv(packet) => {
                    let end = packet.iter().position(|&b| b == 0).unwrap_or(packet.len());
                    Some(String::from_utf8_lossy(&packet[..end]).into_owned())
                }
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug)]
struct ScriptState {
    device_count: Result<u32, UsbError>,
    open: Option<UsbError>,
    set_timeouts: Option<UsbError>,
    send_recv: Option<UsbError>,
    /// Number of upcoming flushes that fail
    flush_failures: u32,
    close: Option<UsbError>,
    replies: VecDeque<Vec<u8>>,
    default_reply: Vec<u8>,
}

impl Default for ScriptState {
    fn default() -> Self {
        Self {
            device_count: Ok(1),
            open: None,
            set_timeouts: None,
            send_recv: None,
            flush_failures: 0,
            close: None,
            replies: VecDeque::new(),
            default_reply: Vec::new(),
        }
    }
}

/// Behaviour of a [`MockDriver`], adjustable while the driver is in use
#[derive(Debug, Clone, Default)]
pub struct MockScript(Arc<Mutex<ScriptState>>);

impl MockScript {
    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.0.lock().expect("mock script poisoned")
    }

    pub fn set_device_count(&self, count: u32) {
        self.state().device_count = Ok(count);
    }

    pub fn fail_enumeration(&self, error: UsbError) {
        self.state().device_count = Err(error);
    }

    pub fn fail_open(&self, error: UsbError) {
        self.state().open = Some(error);
    }

    pub fn fail_set_timeouts(&self, error: UsbError) {
        self.state().set_timeouts = Some(error);
    }

    pub fn fail_send_recv(&self, error: UsbError) {
        self.state().send_recv = Some(error);
    }

    pub fn clear_send_recv_failure(&self) {
        self.state().send_recv = None;
    }

    /// Make the next `times` flushes fail with an I/O error
    pub fn fail_flush_times(&self, times: u32) {
        self.state().flush_failures = times;
    }

    pub fn fail_close(&self, error: UsbError) {
        self.state().close = Some(error);
    }

    /// Queue a reply for the next exchange
    pub fn push_reply(&self, reply: &[u8]) {
        self.state().replies.push_back(reply.to_vec());
    }

    /// Reply used once the queue is empty
    pub fn set_default_reply(&self, reply: &[u8]) {
        self.state().default_reply = reply.to_vec();
    }
}

/// Handle returned by [`MockDriver::open`]
#[derive(Debug, PartialEq, Eq)]
pub struct MockHandle(pub u32);

/// Scripted vendor layer
///
/// Reports one device and replies with an empty buffer unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    script: MockScript,
    calls: CallLog,
    next_handle: u32,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_count(self, count: u32) -> Self {
        self.script.set_device_count(count);
        self
    }

    /// Reply returned to every exchange not covered by a queued reply
    pub fn with_reply(self, reply: &[u8]) -> Self {
        self.script.set_default_reply(reply);
        self
    }

    pub fn with_replies<'a>(self, replies: impl IntoIterator<Item = &'a [u8]>) -> Self {
        for reply in replies {
            self.script.push_reply(reply);
        }
        self
    }

    /// Shared handle on the script, usable after the driver is moved
    pub fn script(&self) -> MockScript {
        self.script.clone()
    }

    /// Shared handle on the call log, usable after the driver is moved
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl PerformaxDriver for MockDriver {
    type Handle = MockHandle;

    fn device_count(&mut self) -> Result<u32, UsbError> {
        self.calls.push(DriverCall::DeviceCount);
        self.script.state().device_count.clone()
    }

    fn open(&mut self, index: u32) -> Result<MockHandle, UsbError> {
        self.calls.push(DriverCall::Open(index));
        if let Some(e) = self.script.state().open.clone() {
            return Err(e);
        }
        self.next_handle += 1;
        Ok(MockHandle(self.next_handle))
    }

    fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<(), UsbError> {
        self.calls.push(DriverCall::SetTimeouts(timeouts));
        match self.script.state().set_timeouts.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn send_recv(
        &mut self,
        _handle: &mut MockHandle,
        command: &[u8],
        _reply_capacity: usize,
    ) -> Result<Vec<u8>, UsbError> {
        self.calls.push(DriverCall::SendRecv(command.to_vec()));
        let mut state = self.script.state();
        if let Some(e) = state.send_recv.clone() {
            return Err(e);
        }
        let queued = state.replies.pop_front();
        Ok(queued.unwrap_or_else(|| state.default_reply.clone()))
    }

    fn flush(&mut self, _handle: &mut MockHandle) -> Result<(), UsbError> {
        self.calls.push(DriverCall::Flush);
        let mut state = self.script.state();
        if state.flush_failures > 0 {
            state.flush_failures -= 1;
            return Err(UsbError::Io);
        }
        Ok(())
    }

    fn close(&mut self, _handle: MockHandle) -> Result<(), UsbError> {
        self.calls.push(DriverCall::Close);
        match self.script.state().close.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Run a future with a timeout
///
/// # Example
/// ```ignore
/// use common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// #[tokio::test]
/// async fn test_with_timeout() {
///     let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await.unwrap();
///     assert_eq!(result, 42);
/// }
/// ```
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test times out
#[derive(Debug)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Test timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}
