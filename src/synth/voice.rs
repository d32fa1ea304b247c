// Tone voice - one sounding oscillator + fade envelope, addressed by a numeric handle

use super::envelope::LinearFade;
use super::oscillator::{Oscillator, SimpleOscillator, Waveform};
use crate::audio::dsp_utils::OnePoleSmoother;

/// Render-side identity of a tone voice
///
/// String ids ("midi-64", "tuning") live on the control side; the audio thread only
/// ever sees handles, so render commands stay `Copy` and allocation-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(pub u64);

/// Everything needed to start a voice on the audio thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSpec {
    pub waveform: Waveform,
    pub frequency: f32,
    /// Target gain once the fade-in completes (volume × level)
    pub gain: f32,
    pub fade_in_secs: f32,
}

pub struct ToneVoice {
    handle: VoiceHandle,
    oscillator: SimpleOscillator,
    fade: LinearFade,
    gain: OnePoleSmoother,
    target_gain: f32,
    /// Start order, for slot stealing (lower = older)
    age: u64,
}

impl ToneVoice {
    pub fn start(
        handle: VoiceHandle,
        spec: VoiceSpec,
        age: u64,
        gain_smoothing_ms: f32,
        sample_rate: f32,
    ) -> Self {
        let mut fade = LinearFade::new(sample_rate);
        fade.fade_in(spec.fade_in_secs);
        Self {
            handle,
            oscillator: SimpleOscillator::new(spec.waveform, spec.frequency, sample_rate),
            fade,
            gain: OnePoleSmoother::new(spec.gain, gain_smoothing_ms, sample_rate),
            target_gain: spec.gain,
            age,
        }
    }

    pub fn handle(&self) -> VoiceHandle {
        self.handle
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn frequency(&self) -> f32 {
        self.oscillator.frequency()
    }

    /// Glide toward a new gain without touching the oscillator phase
    pub fn set_gain(&mut self, gain: f32) {
        self.target_gain = gain;
    }

    pub fn target_gain(&self) -> f32 {
        self.target_gain
    }

    pub fn current_gain(&self) -> f32 {
        self.gain.get()
    }

    pub fn stop(&mut self, fade_out_secs: f32) {
        self.fade.fade_out(fade_out_secs);
    }

    /// Voice still produces sound (fading in, holding or fading out)
    pub fn is_active(&self) -> bool {
        self.fade.is_active()
    }

    pub fn is_releasing(&self) -> bool {
        self.fade.is_fading_out()
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let envelope = self.fade.process();
        let gain = self.gain.process(self.target_gain);
        self.oscillator.next_sample() * envelope * gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;

    fn saw_spec(gain: f32) -> VoiceSpec {
        VoiceSpec {
            waveform: Waveform::Saw,
            frequency: 220.0,
            gain,
            fade_in_secs: 0.02,
        }
    }

    fn peak(voice: &mut ToneVoice, samples: usize) -> f32 {
        (0..samples)
            .map(|_| voice.next_sample().abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_voice_fades_in_to_gain() {
        let mut voice = ToneVoice::start(VoiceHandle(1), saw_spec(0.2), 0, 100.0, SAMPLE_RATE);
        // First sample is silent: fades start at zero
        assert_eq!(voice.next_sample(), 0.0);
        let early = peak(&mut voice, 200);
        let _ = peak(&mut voice, 1000);
        let settled = peak(&mut voice, 2000);
        assert!(early < settled);
        assert!((settled - 0.2).abs() < 0.01, "settled = {settled}");
    }

    #[test]
    fn test_voice_stop_releases() {
        let mut voice = ToneVoice::start(VoiceHandle(1), saw_spec(0.2), 0, 100.0, SAMPLE_RATE);
        peak(&mut voice, 2000);
        voice.stop(0.05);
        assert!(voice.is_releasing());
        peak(&mut voice, 2500);
        assert!(!voice.is_active());
        assert_eq!(voice.next_sample(), 0.0);
    }

    #[test]
    fn test_set_gain_glides_without_restart() {
        let mut voice = ToneVoice::start(VoiceHandle(7), saw_spec(0.2), 0, 100.0, SAMPLE_RATE);
        peak(&mut voice, 2000);
        let frequency = voice.frequency();

        voice.set_gain(0.1);
        voice.next_sample();
        // One sample later the gain has barely moved
        assert!(voice.current_gain() > 0.19);

        // Five time constants later it has arrived
        peak(&mut voice, 24000);
        assert!((voice.current_gain() - 0.1).abs() < 0.002);
        assert_eq!(voice.handle(), VoiceHandle(7));
        assert_eq!(voice.frequency(), frequency);
        assert!(voice.is_active());
    }
}
