//! Host-side driver for Arcus Performax motor controllers
//!
//! Implements the vendor communication layer on top of libusb and wires it
//! to a [`common::DeviceSession`] running on a dedicated worker thread.

pub mod config;
pub mod startup;
pub mod usb;
