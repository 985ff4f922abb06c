//! Protocol library for performax-usb
//!
//! This crate defines the wire-level vocabulary for talking to an Arcus
//! Performax motor controller over USB: bounded command and reply buffers,
//! command packet encoding, USB identifiers and the transport error type.
//!
//! # Example
//!
//! ```
//! use protocol::{Command, Reply, encode_command};
//!
//! let cmd = Command::new("PX").unwrap();
//! let packet = encode_command(&cmd);
//! assert_eq!(&packet[..3], b"PX\0");
//!
//! let reply = Reply::from_bytes(b"1500\0\0\0\0");
//! assert_eq!(reply.text(), "1500");
//! ```

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{
    CONTROL_REQUEST, CONTROL_REQUEST_TYPE, ControlValue, ENDPOINT_IN, ENDPOINT_OUT,
    PERFORMAX_INTERFACE, PERFORMAX_PRODUCT_ID, PERFORMAX_VENDOR_ID, decode_reply, encode_command,
    is_performax,
};
pub use error::{ProtocolError, Result};
pub use types::{
    COMMAND_CAPACITY, Command, DEFAULT_TIMEOUT, DeviceInfo, MAX_COMMAND_LEN, REPLY_CAPACITY, Reply,
    Timeouts, UsbError,
};
