//! Common utilities for performax-usb
//!
//! This crate provides the device session and everything it is built from:
//! the vendor driver abstraction, error handling, logging setup and the
//! async channel bridge that serializes access to the session thread.

pub mod channel;
pub mod driver;
pub mod error;
pub mod logging;
pub mod session;
pub mod test_utils;

pub use channel::{SessionBridge, SessionCommand, SessionWorker, create_session_bridge};
pub use driver::PerformaxDriver;
pub use error::{Error, ErrorKind, Result};
pub use logging::setup_logging;
pub use session::{DeviceSession, SessionState};
