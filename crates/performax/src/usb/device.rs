//! Open Performax controller
//!
//! Wraps an rusb handle with the claimed command interface and the vendor
//! session that must be started before and ended after bulk exchanges.

use crate::usb::transfers::{map_rusb_error, vendor_control};
use protocol::{ControlValue, PERFORMAX_INTERFACE, UsbError};
use rusb::{Context, Device, DeviceHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Controller with an open handle and a claimed interface
pub struct PerformaxDevice {
    handle: DeviceHandle<Context>,
    bus_number: u8,
    address: u8,
    /// Kernel driver detached by us, to be reattached on close
    kernel_driver_detached: bool,
}

impl PerformaxDevice {
    /// Open the device, claim its interface and start a vendor session
    ///
    /// Anything acquired before a failing step is released again.
    pub fn open(device: &Device<Context>, timeout: Duration) -> Result<Self, UsbError> {
        let handle = device.open().map_err(|e| {
            warn!("Failed to open device: {}", e);
            map_rusb_error(e)
        })?;

        let mut opened = Self {
            handle,
            bus_number: device.bus_number(),
            address: device.address(),
            kernel_driver_detached: false,
        };
        debug!(
            "Opened device bus={:03} addr={:03}",
            opened.bus_number, opened.address
        );

        opened.detach_kernel_driver();

        if let Err(e) = opened.handle.claim_interface(PERFORMAX_INTERFACE) {
            warn!(
                "Failed to claim interface {}: {}",
                PERFORMAX_INTERFACE, e
            );
            opened.reattach_kernel_driver();
            return Err(map_rusb_error(e));
        }
        debug!("Claimed interface {}", PERFORMAX_INTERFACE);

        if let Err(e) = vendor_control(&mut opened.handle, ControlValue::Open, timeout) {
            opened.release();
            return Err(e);
        }

        Ok(opened)
    }

    /// End the vendor session and release the interface
    ///
    /// The interface is released even if ending the session fails; the
    /// first error is returned.
    pub fn close(mut self, timeout: Duration) -> Result<(), UsbError> {
        let result = vendor_control(&mut self.handle, ControlValue::Close, timeout);
        self.release();
        debug!(
            "Closed device bus={:03} addr={:03}",
            self.bus_number, self.address
        );
        result
    }

    /// Get mutable reference to device handle
    pub fn handle_mut(&mut self) -> &mut DeviceHandle<Context> {
        &mut self.handle
    }

    fn detach_kernel_driver(&mut self) {
        match self.handle.kernel_driver_active(PERFORMAX_INTERFACE) {
            Ok(true) => {
                if let Err(e) = self.handle.detach_kernel_driver(PERFORMAX_INTERFACE) {
                    // Claiming will most likely fail next and report the error
                    warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        PERFORMAX_INTERFACE, e
                    );
                } else {
                    debug!("Detached kernel driver from interface {}", PERFORMAX_INTERFACE);
                    self.kernel_driver_detached = true;
                }
            }
            Ok(false) => {
                debug!("No kernel driver active on interface {}", PERFORMAX_INTERFACE);
            }
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    PERFORMAX_INTERFACE, e
                );
            }
        }
    }

    fn reattach_kernel_driver(&mut self) {
        if !self.kernel_driver_detached {
            return;
        }
        if let Err(e) = self.handle.attach_kernel_driver(PERFORMAX_INTERFACE) {
            debug!(
                "Could not reattach kernel driver to interface {}: {}",
                PERFORMAX_INTERFACE, e
            );
        }
        self.kernel_driver_detached = false;
    }

    fn release(&mut self) {
        if let Err(e) = self.handle.release_interface(PERFORMAX_INTERFACE) {
            warn!("Failed to release interface {}: {}", PERFORMAX_INTERFACE, e);
        }
        self.reattach_kernel_driver();
    }
}
