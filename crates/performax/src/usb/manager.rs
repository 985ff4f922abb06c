//! Controller enumeration
//!
//! Finds attached Performax controllers by vendor/product ID, in bus
//! enumeration order. Index 0 of that order is the controller a session opens.

use crate::usb::transfers::map_rusb_error;
use protocol::{DeviceInfo, UsbError, is_performax};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, UsbContext};
use tracing::{debug, warn};

/// All attached Performax controllers
pub fn find_devices(context: &Context) -> Result<Vec<Device<Context>>, UsbError> {
    let devices = context.devices().map_err(map_rusb_error)?;

    let found: Vec<_> = devices
        .iter()
        .filter(|device| match device.device_descriptor() {
            Ok(desc) => is_performax(desc.vendor_id(), desc.product_id()),
            Err(e) => {
                debug!(
                    "Skipping device bus={} addr={}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                false
            }
        })
        .collect();

    debug!("Enumerated {} Performax device(s)", found.len());
    Ok(found)
}

/// Describe every attached controller
///
/// String descriptors are read on a best-effort basis; a controller that
/// cannot be opened (for example due to permissions) is still listed.
pub fn list_devices(context: &Context) -> Result<Vec<DeviceInfo>, UsbError> {
    let devices = find_devices(context)?;
    let mut infos = Vec::with_capacity(devices.len());

    for (index, device) in devices.iter().enumerate() {
        let descriptor = match device.device_descriptor() {
            Ok(desc) => desc,
            Err(e) => {
                warn!("Failed to read device descriptor: {}", e);
                continue;
            }
        };

        let (manufacturer, product, serial_number) = device
            .open()
            .ok()
            .map(|handle| read_string_descriptors(&handle, &descriptor))
            .unwrap_or((None, None, None));

        infos.push(DeviceInfo {
            index: index as u32,
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            bus_number: device.bus_number(),
            device_address: device.address(),
            manufacturer,
            product,
            serial_number,
        });
    }

    Ok(infos)
}

/// Read manufacturer, product and serial strings
fn read_string_descriptors(
    handle: &DeviceHandle<Context>,
    descriptor: &DeviceDescriptor,
) -> (Option<String>, Option<String>, Option<String>) {
    let manufacturer = descriptor
        .manufacturer_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let product = descriptor
        .product_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let serial_number = descriptor
        .serial_number_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    (manufacturer, product, serial_number)
}
