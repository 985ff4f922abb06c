//! Command packet encoding and USB wire constants
//!
//! The controller speaks NUL-terminated ASCII over a pair of bulk endpoints.
//! Every command is sent as a full zero-padded packet and every reply is read
//! into a buffer of the same size.
//!
//! # Packet Format
//!
//! ```text
//! [command bytes][0x00][0x00 padding ...]   (COMMAND_CAPACITY bytes total)
//! ```
//!
//! Session setup and teardown use vendor control requests on endpoint 0.

use crate::types::{COMMAND_CAPACITY, Command, Reply};

/// Arcus Technology vendor ID
pub const PERFORMAX_VENDOR_ID: u16 = 0x1589;

/// Performax controller product ID
pub const PERFORMAX_PRODUCT_ID: u16 = 0xA101;

/// Interface claimed for bulk exchanges
pub const PERFORMAX_INTERFACE: u8 = 0;

/// Bulk OUT endpoint carrying commands
pub const ENDPOINT_OUT: u8 = 0x02;

/// Bulk IN endpoint carrying replies
pub const ENDPOINT_IN: u8 = 0x82;

/// bmRequestType for vendor control requests (host-to-device, vendor, device)
pub const CONTROL_REQUEST_TYPE: u8 = 0x40;

/// bRequest for vendor control requests
pub const CONTROL_REQUEST: u8 = 0x02;

/// Vendor control request values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ControlValue {
    /// Discard pending data in the controller's I/O buffers
    Flush = 0x01,
    /// Start a command session
    Open = 0x02,
    /// End a command session
    Close = 0x04,
}

impl ControlValue {
    pub fn value(self) -> u16 {
        self as u16
    }
}

/// Encode a command into a fixed-size, NUL-terminated packet
///
/// # Example
/// ```
/// use protocol::{Command, COMMAND_CAPACITY, encode_command};
///
/// let packet = encode_command(&Command::new("MST").unwrap());
/// assert_eq!(packet.len(), COMMAND_CAPACITY);
/// assert_eq!(&packet[..4], b"MST\0");
/// ```
pub fn encode_command(command: &Command) -> [u8; COMMAND_CAPACITY] {
    let mut packet = [0u8; COMMAND_CAPACITY];
    let bytes = command.as_bytes();
    // Command::new guarantees len <= MAX_COMMAND_LEN, so the terminator always fits
    packet[..bytes.len()].copy_from_slice(bytes);
    packet
}

/// Wrap bytes read from the IN endpoint as a reply
pub fn decode_reply(bytes: &[u8]) -> Reply {
    Reply::from_bytes(bytes)
}

/// Check whether a USB vendor/product pair identifies a Performax controller
pub fn is_performax(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == PERFORMAX_VENDOR_ID && product_id == PERFORMAX_PRODUCT_ID
}
