// Audio clock - the device-side timeline every scheduled event is measured against

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared sample-accurate clock, advanced only by the render callback
#[derive(Clone, Debug)]
pub struct AudioClock {
    /// Frames rendered since the output was opened
    sample_position: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_position: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate as f64,
        }
    }

    /// Current sample position (any thread)
    pub fn current_sample(&self) -> u64 {
        self.sample_position.load(Ordering::Acquire)
    }

    /// Current device time in seconds
    pub fn now_seconds(&self) -> f64 {
        self.current_sample() as f64 / self.sample_rate
    }

    /// Advance by one rendered buffer (audio thread only)
    pub fn advance(&self, frames: usize) {
        self.sample_position
            .fetch_add(frames as u64, Ordering::AcqRel);
    }

    /// Absolute sample index for a device time, rounded to the nearest frame
    pub fn seconds_to_sample(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            0
        } else {
            (seconds * self.sample_rate).round() as u64
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }
}
