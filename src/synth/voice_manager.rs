// Voice Manager - render-side table of sounding tone voices
//
// Fixed slots, owned by the audio thread. A slot holds its voice until the voice's
// fade-out has fully completed, then is freed on the next sample.

use super::voice::{ToneVoice, VoiceHandle, VoiceSpec};

pub const MAX_VOICES: usize = 16;

pub struct VoiceManager {
    slots: [Option<ToneVoice>; MAX_VOICES],
    /// Age counter incremented on each start for slot stealing priority
    age_counter: u64,
    gain_smoothing_ms: f32,
    sample_rate: f32,
}

impl VoiceManager {
    pub fn new(sample_rate: f32, gain_smoothing_ms: f32) -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            age_counter: 0,
            gain_smoothing_ms,
            sample_rate,
        }
    }

    pub fn start(&mut self, handle: VoiceHandle, spec: VoiceSpec) {
        self.age_counter = self.age_counter.wrapping_add(1);
        let voice = ToneVoice::start(
            handle,
            spec,
            self.age_counter,
            self.gain_smoothing_ms,
            self.sample_rate,
        );

        let index = self
            .slots
            .iter()
            .position(|slot| slot.as_ref().is_none_or(|voice| !voice.is_active()))
            .unwrap_or_else(|| self.find_voice_to_steal());
        self.slots[index] = Some(voice);
    }

    /// Pick the slot to reuse when all are taken
    ///
    /// Priority (best to worst):
    /// 1. Voice already fading out (least perceptible)
    /// 2. Oldest voice
    fn find_voice_to_steal(&self) -> usize {
        let mut best_index = 0;
        let mut best_priority = (false, u64::MAX);

        for (i, voice) in self.slots.iter().enumerate() {
            let Some(voice) = voice.as_ref().filter(|v| v.is_active()) else {
                return i;
            };
            let is_releasing = voice.is_releasing();
            let age = voice.age();

            let should_steal = if is_releasing != best_priority.0 {
                is_releasing
            } else {
                age < best_priority.1
            };

            if should_steal {
                best_priority = (is_releasing, age);
                best_index = i;
            }
        }

        best_index
    }

    /// Begin the fade-out of a voice; unknown handles are ignored
    pub fn stop(&mut self, handle: VoiceHandle, fade_out_secs: f32) {
        if let Some(voice) = self.voice_mut(handle) {
            voice.stop(fade_out_secs);
        }
    }

    pub fn set_gain(&mut self, handle: VoiceHandle, gain: f32) {
        if let Some(voice) = self.voice_mut(handle) {
            voice.set_gain(gain);
        }
    }

    fn voice_mut(&mut self, handle: VoiceHandle) -> Option<&mut ToneVoice> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|voice| voice.handle() == handle)
    }

    pub fn voice(&self, handle: VoiceHandle) -> Option<&ToneVoice> {
        self.slots
            .iter()
            .flatten()
            .find(|voice| voice.handle() == handle)
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let mut mix = 0.0;
        for slot in self.slots.iter_mut() {
            if let Some(voice) = slot {
                mix += voice.next_sample();
                if !voice.is_active() {
                    *slot = None;
                }
            }
        }
        mix
    }

    pub fn active_voice_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::oscillator::Waveform;

    const SAMPLE_RATE: f32 = 44100.0;

    fn spec(frequency: f32) -> VoiceSpec {
        VoiceSpec {
            waveform: Waveform::Saw,
            frequency,
            gain: 0.2,
            fade_in_secs: 0.02,
        }
    }

    fn run(vm: &mut VoiceManager, samples: usize) {
        for _ in 0..samples {
            vm.next_sample();
        }
    }

    #[test]
    fn test_voice_allocation() {
        let mut vm = VoiceManager::new(SAMPLE_RATE, 100.0);
        assert_eq!(vm.active_voice_count(), 0);

        vm.start(VoiceHandle(1), spec(261.63));
        vm.start(VoiceHandle(2), spec(329.63));
        vm.start(VoiceHandle(3), spec(392.0));
        assert_eq!(vm.active_voice_count(), 3);
    }

    #[test]
    fn test_stopped_voice_keeps_slot_until_fade_completes() {
        let mut vm = VoiceManager::new(SAMPLE_RATE, 100.0);
        vm.start(VoiceHandle(1), spec(261.63));
        vm.start(VoiceHandle(2), spec(329.63));
        run(&mut vm, 2000);

        vm.stop(VoiceHandle(2), 0.05);
        assert_eq!(vm.active_voice_count(), 2);
        assert!(vm.voice(VoiceHandle(2)).unwrap().is_releasing());

        // 50ms at 44.1kHz = 2205 samples
        run(&mut vm, 2300);
        assert_eq!(vm.active_voice_count(), 1);
        assert!(vm.voice(VoiceHandle(2)).is_none());
        assert!(vm.voice(VoiceHandle(1)).is_some());
    }

    #[test]
    fn test_unknown_handle_is_ignored() {
        let mut vm = VoiceManager::new(SAMPLE_RATE, 100.0);
        vm.start(VoiceHandle(1), spec(440.0));
        vm.stop(VoiceHandle(99), 0.05);
        vm.set_gain(VoiceHandle(99), 0.0);
        assert_eq!(vm.active_voice_count(), 1);
    }

    #[test]
    fn test_steal_prefers_releasing_voice() {
        let mut vm = VoiceManager::new(SAMPLE_RATE, 100.0);
        for i in 0..MAX_VOICES as u64 {
            vm.start(VoiceHandle(i), spec(200.0 + i as f32));
        }
        vm.stop(VoiceHandle(5), 0.05);

        vm.start(VoiceHandle(100), spec(880.0));
        assert_eq!(vm.active_voice_count(), MAX_VOICES);
        assert!(vm.voice(VoiceHandle(5)).is_none());
        assert!(vm.voice(VoiceHandle(100)).is_some());
    }

    #[test]
    fn test_steal_oldest_when_none_releasing() {
        let mut vm = VoiceManager::new(SAMPLE_RATE, 100.0);
        for i in 0..MAX_VOICES as u64 {
            vm.start(VoiceHandle(i), spec(200.0 + i as f32));
        }
        vm.start(VoiceHandle(100), spec(880.0));
        assert!(vm.voice(VoiceHandle(0)).is_none());
        assert!(vm.voice(VoiceHandle(1)).is_some());
    }

    #[test]
    fn test_same_handle_frequency_restart_not_needed_for_gain_change() {
        let mut vm = VoiceManager::new(SAMPLE_RATE, 100.0);
        vm.start(VoiceHandle(1), spec(440.0));
        run(&mut vm, 1000);
        vm.set_gain(VoiceHandle(1), 0.05);
        let voice = vm.voice(VoiceHandle(1)).unwrap();
        assert_eq!(voice.target_gain(), 0.05);
        assert_eq!(voice.frequency(), 440.0);
    }

    #[test]
    fn test_mix_is_finite_and_bounded() {
        let mut vm = VoiceManager::new(SAMPLE_RATE, 100.0);
        assert_eq!(vm.next_sample(), 0.0);
        for (i, f) in [261.63, 329.63, 392.0, 523.25].into_iter().enumerate() {
            vm.start(VoiceHandle(i as u64), spec(f));
        }
        for _ in 0..5000 {
            let sample = vm.next_sample();
            assert!(sample.is_finite());
            assert!(sample.abs() <= 0.8 + 1e-3);
        }
    }
}
