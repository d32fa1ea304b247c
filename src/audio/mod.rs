// Audio - cpal backends, the device clock and the real-time renderer

pub mod capture;
pub mod clock;
pub mod device;
pub mod dsp_utils;
pub mod format_conversion;
pub mod output;
pub mod parameters;
pub mod renderer;

pub use clock::AudioClock;
pub use output::{OfflineRenderer, OutputHandle, offline, open_default_output};
pub use parameters::{AtomicF32, SharedParams};
