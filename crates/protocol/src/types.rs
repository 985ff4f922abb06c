//! Core protocol types
//!
//! Bounded command and reply buffers exchanged with a Performax controller,
//! timeout settings and the transport error type shared by every driver.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Size of the command buffer sent to the controller
pub const COMMAND_CAPACITY: usize = 64;

/// Longest command text that still leaves room for the NUL terminator
pub const MAX_COMMAND_LEN: usize = COMMAND_CAPACITY - 1;

/// Size of the reply buffer read back from the controller
pub const REPLY_CAPACITY: usize = 64;

/// Default read/write timeout applied on connect
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// ASCII command understood by the controller
///
/// Construction checks the command against the fixed command buffer, so a
/// `Command` can always be copied into a packet without truncation.
///
/// # Example
/// ```
/// use protocol::Command;
///
/// let cmd = Command::new("PX").unwrap();
/// assert_eq!(cmd.as_str(), "PX");
/// assert!(Command::new("X".repeat(64)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Command(String);

impl Command {
    /// Validate and wrap a command string
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();

        if text.is_empty() {
            return Err(ProtocolError::EmptyCommand);
        }
        if text.len() > MAX_COMMAND_LEN {
            return Err(ProtocolError::CommandTooLong {
                len: text.len(),
                max: MAX_COMMAND_LEN,
            });
        }
        if let Some(position) = text.bytes().position(|b| b == 0) {
            return Err(ProtocolError::InteriorNul { position });
        }

        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in bytes, excluding the terminator
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Command {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Command {
    type Error = ProtocolError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Command> for String {
    fn from(cmd: Command) -> Self {
        cmd.0
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Raw reply captured from the controller
///
/// Holds at most [`REPLY_CAPACITY`] bytes exactly as the driver returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    bytes: Vec<u8>,
}

impl Reply {
    /// Capture a reply, truncating anything past the reply buffer size
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let len = bytes.len().min(REPLY_CAPACITY);
        Self {
            bytes: bytes[..len].to_vec(),
        }
    }

    /// Raw reply bytes, including any NUL padding
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reply as the controller's C string: everything before the first NUL
    pub fn text(&self) -> Cow<'_, str> {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.bytes.len());
        String::from_utf8_lossy(&self.bytes[..end])
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Read and write timeouts for controller exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read: Duration,
    pub write: Duration,
}

impl Timeouts {
    pub fn from_millis(read_ms: u64, write_ms: u64) -> Self {
        Self {
            read: Duration::from_millis(read_ms),
            write: Duration::from_millis(write_ms),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: DEFAULT_TIMEOUT,
            write: DEFAULT_TIMEOUT,
        }
    }
}

/// Summary of an attached Performax controller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position in enumeration order (the session always opens index 0)
    pub index: u32,
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
    /// USB bus number
    pub bus_number: u8,
    /// Device address on the bus
    pub device_address: u8,
    /// Manufacturer string (if available)
    pub manufacturer: Option<String>,
    /// Product string (if available)
    pub product: Option<String>,
    /// Serial number string (if available)
    pub serial_number: Option<String>,
}

/// USB error types
///
/// Maps to libusb error codes. See rusb::Error for details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
pub enum UsbError {
    /// Transfer timed out
    #[error("transfer timed out")]
    Timeout,
    /// Endpoint stalled (protocol error)
    #[error("endpoint stalled")]
    Pipe,
    /// Device was disconnected
    #[error("device disconnected")]
    NoDevice,
    /// Device or endpoint not found
    #[error("device not found")]
    NotFound,
    /// Device is busy
    #[error("device busy")]
    Busy,
    /// Buffer overflow
    #[error("buffer overflow")]
    Overflow,
    /// I/O error
    #[error("I/O error")]
    Io,
    /// Invalid parameter
    #[error("invalid parameter")]
    InvalidParam,
    /// Access denied (permissions)
    #[error("access denied")]
    Access,
    /// Fewer bytes were accepted than were sent
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    /// Other error with message
    #[error("{message}")]
    Other { message: String },
}
