// Tuner - autocorrelation pitch detection on microphone input

pub mod analyzer;
pub mod note;
pub mod pitch;

pub use analyzer::{RollingWindow, Tuner};
pub use note::PitchEstimate;
pub use pitch::{PitchDetector, detect_pitch};
