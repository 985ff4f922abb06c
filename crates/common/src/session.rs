//! Device session
//!
//! Owns the single open handle to a Performax controller together with the
//! last command sent and the last reply received. All exchanges are
//! synchronous and bounded by the timeouts applied on connect.

use crate::driver::PerformaxDriver;
use crate::error::{Error, Result};
use protocol::{Command, REPLY_CAPACITY, Reply, Timeouts, encode_command};
use tracing::{debug, info, warn};

/// Controller opened by [`DeviceSession::connect`]
const DEVICE_INDEX: u32 = 0;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

/// Command/reply session with one controller
pub struct DeviceSession<D: PerformaxDriver> {
    driver: D,
    /// Present only while connected
    handle: Option<D::Handle>,
    timeouts: Timeouts,
    last_command: Option<Command>,
    reply: Reply,
}

impl<D: PerformaxDriver> DeviceSession<D> {
    /// Create a disconnected session using the default 500ms timeouts
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            handle: None,
            timeouts: Timeouts::default(),
            last_command: None,
            reply: Reply::default(),
        }
    }

    /// Override the timeouts applied on the next connect
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn state(&self) -> SessionState {
        if self.handle.is_some() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Enumerate, open the first controller and apply the timeouts
    ///
    /// Returns the number of controllers found. If setting the timeouts
    /// fails the freshly opened handle is closed again.
    pub fn connect(&mut self) -> Result<u32> {
        if self.handle.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let count = self.driver.device_count().map_err(|e| {
            warn!("Device enumeration failed: {}", e);
            Error::Enumeration(e)
        })?;
        info!("Found {} Performax device(s)", count);

        if count == 0 {
            return Err(Error::NoDevices);
        }

        let handle = self.driver.open(DEVICE_INDEX).map_err(|e| {
            warn!("Error opening device {}: {}", DEVICE_INDEX, e);
            Error::Open {
                index: DEVICE_INDEX,
                source: e,
            }
        })?;
        info!("Device {} opened", DEVICE_INDEX);

        if let Err(e) = self.driver.set_timeouts(self.timeouts) {
            warn!("Error setting timeouts: {}", e);
            if let Err(close_err) = self.driver.close(handle) {
                warn!("Error closing device after failed setup: {}", close_err);
            }
            return Err(Error::TimeoutConfig(e));
        }
        debug!(
            "Set timeouts: read={}ms, write={}ms",
            self.timeouts.read.as_millis(),
            self.timeouts.write.as_millis()
        );

        self.handle = Some(handle);
        Ok(count)
    }

    /// Send a command and capture its reply
    ///
    /// On failure the reply buffer is cleared.
    pub fn send(&mut self, command: &Command) -> Result<&Reply> {
        let handle = self.handle.as_mut().ok_or(Error::NotConnected)?;

        let packet = encode_command(command);
        self.last_command = Some(command.clone());

        match self.driver.send_recv(handle, &packet, REPLY_CAPACITY) {
            Ok(bytes) => {
                self.reply = Reply::from_bytes(&bytes);
                info!(
                    "Command succeeded: {}, response: {}",
                    command,
                    self.reply.text()
                );
                Ok(&self.reply)
            }
            Err(e) => {
                self.reply = Reply::default();
                warn!("Command {} failed: {}", command, e);
                Err(Error::SendRecv {
                    command: command.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Validate `command` and send it
    pub fn send_str(&mut self, command: &str) -> Result<&Reply> {
        if self.handle.is_none() {
            return Err(Error::NotConnected);
        }
        let command = Command::new(command)?;
        self.send(&command)
    }

    /// Most recent reply (empty before the first successful exchange)
    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    pub fn last_command(&self) -> Option<&Command> {
        self.last_command.as_ref()
    }

    /// Discard data pending in the controller's buffers
    pub fn flush(&mut self) -> Result<()> {
        let handle = self.handle.as_mut().ok_or(Error::NotConnected)?;

        self.driver.flush(handle).map_err(|e| {
            warn!("Error flushing comms: {}", e);
            Error::Flush(e)
        })?;
        debug!("Comms flushed");
        Ok(())
    }

    /// Close the handle
    ///
    /// The session is disconnected afterwards even if closing failed.
    pub fn disconnect(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(Error::NotConnected)?;

        self.driver.close(handle).map_err(|e| {
            warn!("Error disconnecting device: {}", e);
            Error::Close(e)
        })?;
        info!("Device disconnected");
        Ok(())
    }
}

impl<D: PerformaxDriver> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Closing device on session drop");
            if let Err(e) = self.driver.close(handle) {
                warn!("Error closing device on drop: {}", e);
            }
        }
    }
}
