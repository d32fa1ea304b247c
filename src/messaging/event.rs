// Engine events - Engine → UI
//
// Delivered over a bounded crossbeam channel. When the UI falls behind, new events are
// dropped rather than blocking the scheduler or the analysis thread.

use crate::tuner::note::PitchEstimate;

/// One pitch-analysis outcome
#[derive(Debug, Clone, PartialEq)]
pub enum TunerReading {
    Detected(PitchEstimate),
    /// Input below the silence gate, or no usable period found
    NoSignal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A main beat just sounded; index counts from 0 since the last start
    Beat { index: u64 },
    Pitch(TunerReading),
    /// The output stream reported an error and was marked unusable
    DeviceError(String),
}

impl EngineEvent {
    pub fn is_beat(&self) -> bool {
        matches!(self, EngineEvent::Beat { .. })
    }
}
