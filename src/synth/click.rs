// Click synthesizer - short percussive square-wave clicks at exact device times
//
// Control side (`ClickSynth`) turns a (time, frequency, multiplier) request into a
// sample-stamped render command. Render side (`ClickVoice`) plays it: full amplitude on
// the start sample, exponential decay toward the floor, brief hold, then release.

use crate::audio::clock::AudioClock;
use crate::audio::parameters::SharedParams;
use crate::config::ClickConfig;
use crate::messaging::channels::CommandSender;
use crate::messaging::command::RenderCommand;
use crate::synth::envelope::ExponentialDecay;
use crate::synth::oscillator::{Oscillator, SimpleOscillator, Waveform};

/// One click request, in device-clock seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledClick {
    pub output_time: f64,
    pub frequency: f32,
    pub amplitude_multiplier: f32,
}

impl ScheduledClick {
    pub fn main(output_time: f64, config: &ClickConfig) -> Self {
        Self {
            output_time,
            frequency: config.main_frequency,
            amplitude_multiplier: config.main_multiplier,
        }
    }

    pub fn subdivision(output_time: f64, config: &ClickConfig) -> Self {
        Self {
            output_time,
            frequency: config.subdivision_frequency,
            amplitude_multiplier: config.subdivision_multiplier,
        }
    }
}

/// Anything clicks can be scheduled into
pub trait ClickSink {
    fn play_click(&mut self, click: ScheduledClick);
}

/// Collects clicks instead of sounding them
impl ClickSink for Vec<ScheduledClick> {
    fn play_click(&mut self, click: ScheduledClick) {
        self.push(click);
    }
}

/// Control-side click scheduler, feeding the render command queue
#[derive(Clone, Debug)]
pub struct ClickSynth {
    clock: AudioClock,
    commands: CommandSender,
    params: SharedParams,
}

impl ClickSynth {
    pub fn new(clock: AudioClock, commands: CommandSender, params: SharedParams) -> Self {
        Self {
            clock,
            commands,
            params,
        }
    }
}

impl ClickSink for ClickSynth {
    fn play_click(&mut self, click: ScheduledClick) {
        let amplitude = self.params.volume() * click.amplitude_multiplier;
        if amplitude <= ExponentialDecay::FLOOR {
            return;
        }

        let command = RenderCommand::Click {
            at_sample: self.clock.seconds_to_sample(click.output_time),
            frequency: click.frequency,
            amplitude,
        };
        if let Err(e) = self.commands.send(command) {
            log::warn!(
                "[SCHEDULER] Dropping click at {:.3}s: {}",
                click.output_time,
                e
            );
        }
    }
}

/// A sounding click (audio thread)
#[derive(Debug, Clone)]
pub struct ClickVoice {
    oscillator: SimpleOscillator,
    envelope: ExponentialDecay,
}

impl ClickVoice {
    pub fn new(frequency: f32, amplitude: f32, config: &ClickConfig, sample_rate: f32) -> Self {
        let decay_samples = (config.duration_ms * 0.001 * sample_rate).round() as u32;
        let hold_samples = (config.tail_ms * 0.001 * sample_rate).round() as u32;
        Self {
            oscillator: SimpleOscillator::new(Waveform::Square, frequency, sample_rate),
            envelope: ExponentialDecay::new(
                amplitude,
                ExponentialDecay::FLOOR,
                decay_samples,
                hold_samples,
            ),
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let gain = self.envelope.process();
        self.oscillator.next_sample() * gain
    }

    pub fn is_active(&self) -> bool {
        self.envelope.is_active()
    }
}
