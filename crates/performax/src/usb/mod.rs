//! USB subsystem
//!
//! libusb implementation of the vendor communication layer:
//! - Controller enumeration by vendor/product ID
//! - Opening, claiming and closing a controller
//! - Bulk command/reply exchanges and vendor control requests
//! - The worker thread that owns the session

pub mod device;
pub mod driver;
pub mod manager;
pub mod transfers;
pub mod worker;

// Re-export public types
pub use device::PerformaxDevice;
pub use driver::RusbDriver;
pub use manager::{find_devices, list_devices};
pub use worker::{SessionWorkerThread, spawn_session_worker};
