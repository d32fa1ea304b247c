// Render commands - Control threads → audio thread
//
// Every command is `Copy` and allocation-free so it can cross the ring buffer and be
// applied inside the render callback.

use crate::synth::voice::{VoiceHandle, VoiceSpec};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderCommand {
    /// Start a click at an absolute sample of the audio clock
    Click {
        at_sample: u64,
        frequency: f32,
        amplitude: f32,
    },
    /// Drop every click that has not started sounding yet
    CancelClicks,
    StartVoice {
        handle: VoiceHandle,
        spec: VoiceSpec,
    },
    StopVoice {
        handle: VoiceHandle,
        fade_out_secs: f32,
    },
    SetVoiceGain {
        handle: VoiceHandle,
        gain: f32,
    },
}
