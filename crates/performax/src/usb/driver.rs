//! libusb-backed vendor layer

use crate::usb::device::PerformaxDevice;
use crate::usb::manager::find_devices;
use crate::usb::transfers::{self, map_rusb_error};
use common::PerformaxDriver;
use protocol::{Timeouts, UsbError};
use rusb::Context;
use tracing::debug;

/// [`PerformaxDriver`] talking to controllers through libusb
pub struct RusbDriver {
    context: Context,
    timeouts: Timeouts,
}

impl RusbDriver {
    pub fn new() -> Result<Self, UsbError> {
        let context = Context::new().map_err(map_rusb_error)?;
        Ok(Self {
            context,
            timeouts: Timeouts::default(),
        })
    }

    /// Timeouts used from the first open onwards
    ///
    /// The session only applies its timeouts after opening, so the vendor
    /// "open" request would otherwise run with the defaults.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl PerformaxDriver for RusbDriver {
    type Handle = PerformaxDevice;

    fn device_count(&mut self) -> Result<u32, UsbError> {
        Ok(find_devices(&self.context)?.len() as u32)
    }

    fn open(&mut self, index: u32) -> Result<PerformaxDevice, UsbError> {
        let devices = find_devices(&self.context)?;
        let device = devices.get(index as usize).ok_or(UsbError::NotFound)?;
        PerformaxDevice::open(device, self.timeouts.write)
    }

    fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<(), UsbError> {
        if timeouts.read.is_zero() || timeouts.write.is_zero() {
            // libusb treats zero as "wait forever"
            return Err(UsbError::InvalidParam);
        }
        debug!(
            "Timeouts set: read={}ms, write={}ms",
            timeouts.read.as_millis(),
            timeouts.write.as_millis()
        );
        self.timeouts = timeouts;
        Ok(())
    }

    fn send_recv(
        &mut self,
        handle: &mut PerformaxDevice,
        command: &[u8],
        reply_capacity: usize,
    ) -> Result<Vec<u8>, UsbError> {
        transfers::send_recv(handle.handle_mut(), command, reply_capacity, self.timeouts)
    }

    fn flush(&mut self, handle: &mut PerformaxDevice) -> Result<(), UsbError> {
        transfers::flush(handle.handle_mut(), self.timeouts.write)
    }

    fn close(&mut self, handle: PerformaxDevice) -> Result<(), UsbError> {
        handle.close(self.timeouts.write)
    }
}
