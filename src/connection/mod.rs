// Device connection state

pub mod status;

pub use status::{AtomicDeviceStatus, DeviceStatus};
