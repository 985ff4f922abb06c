//! USB transfer execution
//!
//! Bulk command/reply exchanges and vendor control requests against an open
//! Performax handle, with rusb errors mapped to protocol errors.

use protocol::{
    CONTROL_REQUEST, CONTROL_REQUEST_TYPE, ControlValue, ENDPOINT_IN, ENDPOINT_OUT, Timeouts,
    UsbError,
};
use rusb::{Context, DeviceHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Write a command packet, then read the controller's reply
///
/// Reads at most `reply_capacity` bytes. A write that the device accepts
/// only partially is reported as [`UsbError::ShortWrite`].
pub fn send_recv(
    handle: &mut DeviceHandle<Context>,
    command: &[u8],
    reply_capacity: usize,
    timeouts: Timeouts,
) -> Result<Vec<u8>, UsbError> {
    debug!(
        "Bulk exchange: out={:#x} ({} bytes), in={:#x} (up to {} bytes)",
        ENDPOINT_OUT,
        command.len(),
        ENDPOINT_IN,
        reply_capacity
    );

    let written = handle
        .write_bulk(ENDPOINT_OUT, command, timeouts.write)
        .map_err(|e| {
            warn!("Bulk write failed: {}", e);
            map_rusb_error(e)
        })?;
    if written != command.len() {
        warn!("Short bulk write: {} of {} bytes", written, command.len());
        return Err(UsbError::ShortWrite {
            written,
            expected: command.len(),
        });
    }

    let mut buffer = vec![0u8; reply_capacity];
    let len = handle
        .read_bulk(ENDPOINT_IN, &mut buffer, timeouts.read)
        .map_err(|e| {
            warn!("Bulk read failed: {}", e);
            map_rusb_error(e)
        })?;
    buffer.truncate(len);

    debug!("Bulk exchange succeeded: {} bytes read", len);
    Ok(buffer)
}

/// Issue a vendor control request with no data stage
pub fn vendor_control(
    handle: &mut DeviceHandle<Context>,
    value: ControlValue,
    timeout: Duration,
) -> Result<(), UsbError> {
    debug!(
        "Control transfer: request_type={:#x}, request={:#x}, value={:?}",
        CONTROL_REQUEST_TYPE, CONTROL_REQUEST, value
    );

    handle
        .write_control(
            CONTROL_REQUEST_TYPE,
            CONTROL_REQUEST,
            value.value(),
            0,
            &[],
            timeout,
        )
        .map(|_| ())
        .map_err(|e| {
            warn!("Control transfer {:?} failed: {}", value, e);
            map_rusb_error(e)
        })
}

/// Discard pending data in the controller's buffers
pub fn flush(handle: &mut DeviceHandle<Context>, timeout: Duration) -> Result<(), UsbError> {
    vendor_control(handle, ControlValue::Flush, timeout)
}

/// Map rusb::Error to protocol::UsbError
pub fn map_rusb_error(err: rusb::Error) -> UsbError {
    match err {
        rusb::Error::Timeout => UsbError::Timeout,
        rusb::Error::Pipe => UsbError::Pipe,
        rusb::Error::NoDevice => UsbError::NoDevice,
        rusb::Error::NotFound => UsbError::NotFound,
        rusb::Error::Busy => UsbError::Busy,
        rusb::Error::Overflow => UsbError::Overflow,
        rusb::Error::Io => UsbError::Io,
        rusb::Error::InvalidParam => UsbError::InvalidParam,
        rusb::Error::Access => UsbError::Access,
        _ => UsbError::Other {
            message: err.to_string(),
        },
    }
}
