// Atomic parameters - Lock-free communication UI ↔ scheduler ↔ tuner
// Tempo, volume and subdivision are independently replaceable values (last writer wins)

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU16, AtomicU32, Ordering};

use crate::sequencer::tempo::{Subdivision, Tempo};

/// Thread-safe f32 parameter using atomic operations
/// Converts f32 to u32 bits for atomic storage
#[derive(Clone, Debug)]
pub struct AtomicF32 {
    inner: Arc<AtomicU32>,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            inner: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    pub fn set(&self, value: f32) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Musical parameters shared by the control surface and the scheduler thread
#[derive(Clone, Debug)]
pub struct SharedParams {
    tempo: Arc<AtomicU16>,
    volume: AtomicF32,
    subdivision: Arc<AtomicU8>,
}

impl SharedParams {
    pub fn new(tempo: Tempo, volume: f32, subdivision: Subdivision) -> Self {
        Self {
            tempo: Arc::new(AtomicU16::new(tempo.bpm())),
            volume: AtomicF32::new(volume.clamp(0.0, 1.0)),
            subdivision: Arc::new(AtomicU8::new(subdivision.to_u8())),
        }
    }

    pub fn tempo(&self) -> Tempo {
        Tempo::new(self.tempo.load(Ordering::Relaxed) as i64)
    }

    pub fn set_tempo(&self, tempo: Tempo) {
        self.tempo.store(tempo.bpm(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    /// Stores the volume clamped to [0, 1] and returns the stored value
    pub fn set_volume(&self, volume: f32) -> f32 {
        let clamped = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume.set(clamped);
        clamped
    }

    pub fn subdivision(&self) -> Subdivision {
        Subdivision::from_u8(self.subdivision.load(Ordering::Relaxed))
    }

    pub fn set_subdivision(&self, subdivision: Subdivision) {
        self.subdivision
            .store(subdivision.to_u8(), Ordering::Relaxed);
    }
}

impl Default for SharedParams {
    fn default() -> Self {
        Self::new(Tempo::default(), 0.8, Subdivision::Quarter)
    }
}
