// Renderer - everything that runs inside the audio callback
//
// Owns the tone voices, the pending click queue and the sounding click voices. Fed
// exclusively through the render command ring buffer.
//
// ========== SACRED ZONE ==========
// No allocations, no I/O, no blocking locks in `process_into`.

use cpal::{FromSample, Sample};
use ringbuf::traits::Consumer;

use crate::audio::clock::AudioClock;
use crate::audio::dsp_utils::{flush_denormals_to_zero, soft_clip};
use crate::audio::format_conversion::write_mono_to_interleaved_frame;
use crate::config::{ClickConfig, EngineConfig};
use crate::messaging::channels::CommandConsumer;
use crate::messaging::command::RenderCommand;
use crate::synth::click::ClickVoice;
use crate::synth::voice_manager::VoiceManager;

pub const MAX_CLICK_VOICES: usize = 16;
pub const MAX_PENDING_CLICKS: usize = 64;

#[derive(Debug, Clone, Copy)]
struct PendingClick {
    at_sample: u64,
    frequency: f32,
    amplitude: f32,
}

pub struct Renderer {
    commands: CommandConsumer,
    clock: AudioClock,
    voices: VoiceManager,
    /// Clicks waiting for their start sample (pre-allocated, never grows)
    pending: Vec<PendingClick>,
    clicks: [Option<ClickVoice>; MAX_CLICK_VOICES],
    click_config: ClickConfig,
    sample_rate: f32,
}

impl Renderer {
    pub fn new(commands: CommandConsumer, clock: AudioClock, config: &EngineConfig) -> Self {
        let sample_rate = clock.sample_rate();
        Self {
            commands,
            voices: VoiceManager::new(sample_rate, config.tones.gain_smoothing_ms),
            clock,
            pending: Vec::with_capacity(MAX_PENDING_CLICKS),
            clicks: std::array::from_fn(|_| None),
            click_config: config.click,
            sample_rate,
        }
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    pub fn voices(&self) -> &VoiceManager {
        &self.voices
    }

    pub fn pending_click_count(&self) -> usize {
        self.pending.len()
    }

    pub fn sounding_click_count(&self) -> usize {
        self.clicks.iter().flatten().count()
    }

    fn apply(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::Click {
                at_sample,
                frequency,
                amplitude,
            } => {
                // Overflow drops the newest click
                if self.pending.len() < MAX_PENDING_CLICKS {
                    self.pending.push(PendingClick {
                        at_sample,
                        frequency,
                        amplitude,
                    });
                }
            }
            RenderCommand::CancelClicks => self.pending.clear(),
            RenderCommand::StartVoice { handle, spec } => self.voices.start(handle, spec),
            RenderCommand::StopVoice {
                handle,
                fade_out_secs,
            } => self.voices.stop(handle, fade_out_secs),
            RenderCommand::SetVoiceGain { handle, gain } => self.voices.set_gain(handle, gain),
        }
    }

    fn trigger_due_clicks(&mut self, sample: u64) {
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].at_sample <= sample {
                let click = self.pending.swap_remove(i);
                let voice = ClickVoice::new(
                    click.frequency,
                    click.amplitude,
                    &self.click_config,
                    self.sample_rate,
                );
                let slot = self
                    .clicks
                    .iter()
                    .position(|slot| slot.is_none())
                    .unwrap_or(0);
                self.clicks[slot] = Some(voice);
            } else {
                i += 1;
            }
        }
    }

    #[inline]
    fn next_sample(&mut self, sample: u64) -> f32 {
        if !self.pending.is_empty() {
            self.trigger_due_clicks(sample);
        }

        let mut mix = self.voices.next_sample();
        for slot in self.clicks.iter_mut() {
            if let Some(click) = slot {
                mix += click.next_sample();
                if !click.is_active() {
                    *slot = None;
                }
            }
        }

        soft_clip(flush_denormals_to_zero(mix))
    }

    /// Render one mono buffer and advance the clock by its length
    pub fn process_into(&mut self, output: &mut [f32]) {
        while let Some(command) = self.commands.try_pop() {
            self.apply(command);
        }

        let start = self.clock.current_sample();
        for (offset, out) in output.iter_mut().enumerate() {
            *out = self.next_sample(start + offset as u64);
        }
        self.clock.advance(output.len());
    }

    /// Render one interleaved device buffer, writing the mono mix to every channel
    pub fn process_interleaved<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: Sample + FromSample<f32>,
    {
        while let Some(command) = self.commands.try_pop() {
            self.apply(command);
        }

        let channels = channels.max(1);
        let start = self.clock.current_sample();
        let mut frames = 0;
        for frame in data.chunks_mut(channels) {
            let sample = self.next_sample(start + frames as u64);
            write_mono_to_interleaved_frame(sample, frame);
            frames += 1;
        }
        self.clock.advance(frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::{CommandSender, create_command_channel};
    use crate::synth::oscillator::Waveform;
    use crate::synth::voice::{VoiceHandle, VoiceSpec};

    const SAMPLE_RATE: f32 = 48000.0;

    fn renderer() -> (Renderer, CommandSender) {
        let config = EngineConfig::default();
        let (tx, rx) = create_command_channel(128);
        let clock = AudioClock::new(SAMPLE_RATE);
        (Renderer::new(rx, clock, &config), tx)
    }

    fn first_nonzero(buffer: &[f32]) -> Option<usize> {
        buffer.iter().position(|s| *s != 0.0)
    }

    #[test]
    fn test_silence_when_idle() {
        let (mut renderer, _tx) = renderer();
        let mut buffer = [1.0f32; 256];
        renderer.process_into(&mut buffer);
        assert!(buffer.iter().all(|s| *s == 0.0));
        assert_eq!(renderer.clock().current_sample(), 256);
    }

    #[test]
    fn test_click_starts_at_exact_sample() {
        let (mut renderer, tx) = renderer();
        tx.send(RenderCommand::Click {
            at_sample: 300,
            frequency: 1500.0,
            amplitude: 0.8,
        })
        .unwrap();

        let mut first = [0.0f32; 256];
        renderer.process_into(&mut first);
        assert!(first.iter().all(|s| *s == 0.0));
        assert_eq!(renderer.pending_click_count(), 1);

        let mut second = [0.0f32; 256];
        renderer.process_into(&mut second);
        assert_eq!(first_nonzero(&second), Some(300 - 256));
        assert!((second[300 - 256] - 0.8f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn test_late_click_starts_at_buffer_start() {
        let (mut renderer, tx) = renderer();
        let mut buffer = [0.0f32; 512];
        renderer.process_into(&mut buffer);

        tx.send(RenderCommand::Click {
            at_sample: 10,
            frequency: 1500.0,
            amplitude: 0.5,
        })
        .unwrap();
        renderer.process_into(&mut buffer);
        assert_eq!(first_nonzero(&buffer), Some(0));
    }

    #[test]
    fn test_cancel_drops_pending_clicks() {
        let (mut renderer, tx) = renderer();
        for i in 0..4 {
            tx.send(RenderCommand::Click {
                at_sample: 1000 + i * 100,
                frequency: 800.0,
                amplitude: 0.5,
            })
            .unwrap();
        }
        tx.send(RenderCommand::CancelClicks).unwrap();

        let mut buffer = [0.0f32; 2048];
        renderer.process_into(&mut buffer);
        assert!(buffer.iter().all(|s| *s == 0.0));
        assert_eq!(renderer.pending_click_count(), 0);
    }

    #[test]
    fn test_pending_queue_is_bounded() {
        let (mut renderer, tx) = renderer();
        for i in 0..(MAX_PENDING_CLICKS as u64 + 10) {
            tx.send(RenderCommand::Click {
                at_sample: 100_000 + i,
                frequency: 800.0,
                amplitude: 0.5,
            })
            .unwrap();
        }
        let mut buffer = [0.0f32; 64];
        renderer.process_into(&mut buffer);
        assert_eq!(renderer.pending_click_count(), MAX_PENDING_CLICKS);
    }

    #[test]
    fn test_click_voice_is_released() {
        let (mut renderer, tx) = renderer();
        tx.send(RenderCommand::Click {
            at_sample: 0,
            frequency: 1500.0,
            amplitude: 1.0,
        })
        .unwrap();
        let mut buffer = [0.0f32; 1024];
        renderer.process_into(&mut buffer);
        assert_eq!(renderer.sounding_click_count(), 1);
        // 40ms at 48kHz = 1920 samples in total
        renderer.process_into(&mut buffer);
        assert_eq!(renderer.sounding_click_count(), 0);
    }

    #[test]
    fn test_voice_commands_reach_voice_manager() {
        let (mut renderer, tx) = renderer();
        let handle = VoiceHandle(3);
        tx.send(RenderCommand::StartVoice {
            handle,
            spec: VoiceSpec {
                waveform: Waveform::Saw,
                frequency: 220.0,
                gain: 0.2,
                fade_in_secs: 0.02,
            },
        })
        .unwrap();

        let mut buffer = [0.0f32; 2048];
        renderer.process_into(&mut buffer);
        assert!(buffer.iter().any(|s| s.abs() > 0.1));

        tx.send(RenderCommand::StopVoice {
            handle,
            fade_out_secs: 0.05,
        })
        .unwrap();
        renderer.process_into(&mut buffer);
        renderer.process_into(&mut buffer);
        assert_eq!(renderer.voices().active_voice_count(), 0);
        assert!(buffer[1024..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_interleaved_writes_every_channel() {
        let (mut renderer, tx) = renderer();
        tx.send(RenderCommand::Click {
            at_sample: 0,
            frequency: 1500.0,
            amplitude: 0.5,
        })
        .unwrap();
        let mut data = [0.0f32; 64];
        renderer.process_interleaved(&mut data, 2);
        assert_eq!(renderer.clock().current_sample(), 32);
        for frame in data.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(data[0] > 0.0);
    }
}
