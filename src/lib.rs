// MyMusic Metronome - library exports for the demo binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod connection;
pub mod drone;
pub mod engine;
pub mod error;
pub mod messaging;
pub mod sequencer;
pub mod synth;
pub mod tuner;

// Re-export commonly used types for convenience
pub use audio::clock::AudioClock;
pub use audio::output::{OfflineRenderer, OutputHandle, offline, open_default_output};
pub use config::EngineConfig;
pub use drone::{Chord, DroneManager};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use messaging::{EngineEvent, TunerReading};
pub use sequencer::{LookaheadScheduler, Metronome, ScheduledBeat, Subdivision, Tempo};
pub use synth::{ClickSink, ScheduledClick, ToneBank, ToneControl, VoiceHandle};
pub use tuner::{PitchDetector, PitchEstimate, detect_pitch};
