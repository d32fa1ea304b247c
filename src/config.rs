// Engine configuration - timing constants, click voicing, tone fades and tuner thresholds
//
// Every field has a default, so a RON file only needs the values it overrides:
//
//     (tempo: 90, scheduler: (schedule_ahead_ms: 120.0))

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::sequencer::tempo::{Subdivision, Tempo};

/// Lookahead scheduler timing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Control-thread tick interval
    pub tick_interval_ms: f64,
    /// How far past the device clock beats are scheduled on each tick
    pub schedule_ahead_ms: f64,
    /// Gap between start() and the first beat
    pub start_delay_ms: f64,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_ms / 1000.0)
    }

    pub fn tick_interval_secs(&self) -> f64 {
        self.tick_interval_ms / 1000.0
    }

    pub fn schedule_ahead_secs(&self) -> f64 {
        self.schedule_ahead_ms / 1000.0
    }

    pub fn start_delay_secs(&self) -> f64 {
        self.start_delay_ms / 1000.0
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 25.0,
            schedule_ahead_ms: 100.0,
            start_delay_ms: 50.0,
        }
    }
}

/// Metronome click voicing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickConfig {
    pub main_frequency: f32,
    pub subdivision_frequency: f32,
    pub main_multiplier: f32,
    pub subdivision_multiplier: f32,
    /// Exponential decay window
    pub duration_ms: f32,
    /// Time the click holds at the decay floor before release
    pub tail_ms: f32,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            main_frequency: 1500.0,
            subdivision_frequency: 800.0,
            main_multiplier: 1.0,
            subdivision_multiplier: 0.6,
            duration_ms: 30.0,
            tail_ms: 10.0,
        }
    }
}

/// Drone, synth and tuning tone voicing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub synth_fade_in_ms: f32,
    pub synth_fade_out_ms: f32,
    pub synth_level: f32,
    pub tuning_frequency: f32,
    pub tuning_fade_ms: f32,
    pub tuning_level: f32,
    /// Time constant used when a volume change retargets a sounding voice
    pub gain_smoothing_ms: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            synth_fade_in_ms: 20.0,
            synth_fade_out_ms: 50.0,
            synth_level: 0.25,
            tuning_frequency: 440.0,
            tuning_fade_ms: 100.0,
            tuning_level: 0.5,
            gain_smoothing_ms: 100.0,
        }
    }
}

/// Pitch detector thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub buffer_size: usize,
    /// Frames below this RMS report no signal
    pub silence_rms: f32,
    /// Edge trim threshold applied before autocorrelation
    pub trim_threshold: f32,
    /// Preferred capture sample rate
    pub sample_rate: u32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 2048,
            silence_rms: 0.01,
            trim_threshold: 0.2,
            sample_rate: 44100,
        }
    }
}

/// Ring buffer and event channel capacities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub command_capacity: usize,
    pub event_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_capacity: 512,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tempo: u16,
    pub volume: f32,
    pub subdivision: Subdivision,
    pub scheduler: SchedulerConfig,
    pub click: ClickConfig,
    pub tones: ToneConfig,
    pub tuner: TunerConfig,
    pub channels: ChannelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tempo: Tempo::DEFAULT_BPM,
            volume: 0.8,
            subdivision: Subdivision::Quarter,
            scheduler: SchedulerConfig::default(),
            click: ClickConfig::default(),
            tones: ToneConfig::default(),
            tuner: TunerConfig::default(),
            channels: ChannelConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a RON document and validate it
    pub fn from_ron_str(source: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            ron::from_str(source).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON configuration file
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_ron_str(&content)?;
        log::info!("[CONFIG] Loaded engine config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Serialize to pretty RON
    pub fn to_ron_string(&self) -> EngineResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> EngineResult<()> {
        let s = &self.scheduler;
        if s.tick_interval_ms <= 0.0 || s.schedule_ahead_ms <= s.tick_interval_ms {
            return Err(EngineError::Config(format!(
                "schedule_ahead_ms ({}) must exceed a positive tick_interval_ms ({})",
                s.schedule_ahead_ms, s.tick_interval_ms
            )));
        }
        if s.start_delay_ms < 0.0 {
            return Err(EngineError::Config("start_delay_ms must be >= 0".into()));
        }
        if self.click.duration_ms <= 0.0 || self.click.tail_ms < 0.0 {
            return Err(EngineError::Config("click duration must be positive".into()));
        }
        if self.tuner.buffer_size < 64 {
            return Err(EngineError::Config(format!(
                "tuner buffer_size {} is too small",
                self.tuner.buffer_size
            )));
        }
        if self.channels.command_capacity == 0 || self.channels.event_capacity == 0 {
            return Err(EngineError::Config("channel capacities must be > 0".into()));
        }
        Ok(())
    }
}
