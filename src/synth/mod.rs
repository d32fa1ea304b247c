// Synthesis - oscillators, envelopes, tone voices and clicks

pub mod click;
pub mod envelope;
pub mod oscillator;
pub mod tone_bank;
pub mod voice;
pub mod voice_manager;

pub use click::{ClickSink, ClickSynth, ClickVoice, ScheduledClick};
pub use oscillator::{Oscillator, SimpleOscillator, Waveform};
pub use tone_bank::{ToneBank, ToneControl};
pub use voice::{ToneVoice, VoiceHandle, VoiceSpec};
pub use voice_manager::VoiceManager;
