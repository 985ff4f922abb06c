//! Vendor communication layer
//!
//! The six operations a [`DeviceSession`](crate::session::DeviceSession)
//! needs from whatever actually talks to the controller. The libusb backend
//! lives in the `performax` crate; tests use
//! [`MockDriver`](crate::test_utils::MockDriver).

use protocol::{Timeouts, UsbError};

/// Transport able to enumerate, open and exchange packets with a controller
pub trait PerformaxDriver {
    /// Opaque handle to one open controller
    type Handle;

    /// Number of attached controllers
    fn device_count(&mut self) -> Result<u32, UsbError>;

    /// Open the controller at `index` in enumeration order
    fn open(&mut self, index: u32) -> Result<Self::Handle, UsbError>;

    /// Set the read/write timeouts used by subsequent exchanges
    fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<(), UsbError>;

    /// Write `command` and read back at most `reply_capacity` bytes
    fn send_recv(
        &mut self,
        handle: &mut Self::Handle,
        command: &[u8],
        reply_capacity: usize,
    ) -> Result<Vec<u8>, UsbError>;

    /// Discard data pending in the controller's buffers
    fn flush(&mut self, handle: &mut Self::Handle) -> Result<(), UsbError>;

    /// Close the handle; it cannot be used afterwards
    fn close(&mut self, handle: Self::Handle) -> Result<(), UsbError>;
}
