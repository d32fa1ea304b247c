// Audio capture - microphone input for the tuner
//
// Captured blocks are downmixed to mono f32 and forwarded over a crossbeam channel to
// the analysis thread. The input callback never blocks: a full channel drops the block.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use cpal::{SupportedStreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::Sender;

use crate::audio::device::AudioDeviceManager;
use crate::audio::format_conversion::downmix_interleaved_to_mono;
use crate::error::{EngineError, EngineResult};

/// A source of microphone blocks
pub trait Microphone {
    /// Start capturing; blocks are sent to `frames` until the handle is dropped
    fn open(&mut self, frames: Sender<Vec<f32>>) -> EngineResult<CaptureHandle>;
}

/// Keeps a capture running; dropping it releases the device
pub struct CaptureHandle {
    sample_rate: u32,
    stream: Option<Stream>,
}

impl CaptureHandle {
    pub fn from_stream(stream: Stream, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stream: Some(stream),
        }
    }

    /// A capture with no device behind it (the source feeds the channel itself)
    pub fn detached(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stream: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn has_device(&self) -> bool {
        self.stream.is_some()
    }
}

/// Default cpal input device
pub struct CpalMicrophone {
    preferred_sample_rate: u32,
}

impl CpalMicrophone {
    pub fn new(preferred_sample_rate: u32) -> Self {
        Self {
            preferred_sample_rate,
        }
    }
}

impl Microphone for CpalMicrophone {
    fn open(&mut self, frames: Sender<Vec<f32>>) -> EngineResult<CaptureHandle> {
        let device = AudioDeviceManager::new()
            .default_input_device()
            .ok_or_else(|| EngineError::Microphone("no input device available".to_string()))?;
        log::info!(
            "[TUNER] Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported = choose_input_config(&device, self.preferred_sample_rate)?;
        let sample_format = supported.sample_format();
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: StreamConfig = supported.into();
        log::info!(
            "[TUNER] Capture: {} Hz, {} channel(s), {:?}",
            sample_rate,
            channels,
            sample_format
        );

        let stream = match sample_format {
            SampleFormat::F32 => build_input_stream::<f32>(&device, &config, channels, frames),
            SampleFormat::I16 => build_input_stream::<i16>(&device, &config, channels, frames),
            SampleFormat::U16 => build_input_stream::<u16>(&device, &config, channels, frames),
            other => Err(EngineError::Microphone(format!(
                "unsupported input sample format: {:?}",
                other
            ))),
        }?;

        stream
            .play()
            .map_err(|e| EngineError::Microphone(format!("cannot start capture: {}", e)))?;

        Ok(CaptureHandle::from_stream(stream, sample_rate))
    }
}

/// Mono f32 closest to the preferred rate, else the device default
fn choose_input_config(device: &Device, target_rate: u32) -> EngineResult<SupportedStreamConfig> {
    let mono_f32 = device
        .supported_input_configs()
        .ok()
        .and_then(|configs| find_mono_f32_config(configs.collect(), target_rate));

    if let Some(range) = mono_f32 {
        let rate = target_rate.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
        return Ok(range.with_sample_rate(cpal::SampleRate(rate)));
    }

    log::debug!("[TUNER] No mono f32 input format, falling back to the device default");
    device
        .default_input_config()
        .map_err(|e| EngineError::Microphone(format!("no usable input configuration: {}", e)))
}

fn find_mono_f32_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            }
        })
}

fn build_input_stream<T>(
    device: &Device,
    config: &StreamConfig,
    channels: usize,
    frames: Sender<Vec<f32>>,
) -> EngineResult<Stream>
where
    T: SizedSample + Sample + Send + 'static,
    f32: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mut block = Vec::with_capacity(data.len() / channels.max(1));
                downmix_interleaved_to_mono(data, channels, &mut block);
                // Full channel: the analysis thread is behind, skip this block
                let _ = frames.try_send(block);
            },
            |err| log::error!("[TUNER] Capture stream error: {}", err),
            None,
        )
        .map_err(|e| EngineError::Microphone(format!("cannot open capture stream: {}", e)))
}

/// Replays prepared mono blocks as if they came from a microphone
///
/// Used for headless runs: the blocks are fed from a short-lived thread, after which
/// the capture simply runs dry.
pub struct BufferedMicrophone {
    sample_rate: u32,
    blocks: Vec<Vec<f32>>,
}

impl BufferedMicrophone {
    pub fn new(sample_rate: u32, blocks: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            blocks,
        }
    }

    /// `seconds` of a sine at `frequency`, split into `block_size` blocks
    pub fn sine(sample_rate: u32, frequency: f32, amplitude: f32, seconds: f32, block_size: usize) -> Self {
        let total = (seconds * sample_rate as f32) as usize;
        let step = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate as f64;
        let samples: Vec<f32> = (0..total)
            .map(|i| amplitude * (step * i as f64).sin() as f32)
            .collect();
        let blocks = samples
            .chunks(block_size.max(1))
            .map(<[f32]>::to_vec)
            .collect();
        Self::new(sample_rate, blocks)
    }
}

impl Microphone for BufferedMicrophone {
    fn open(&mut self, frames: Sender<Vec<f32>>) -> EngineResult<CaptureHandle> {
        let blocks = std::mem::take(&mut self.blocks);
        std::thread::Builder::new()
            .name("buffered-microphone".to_string())
            .spawn(move || {
                for block in blocks {
                    if frames.send(block).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| EngineError::Microphone(format!("cannot start feeder: {}", e)))?;
        Ok(CaptureHandle::detached(self.sample_rate))
    }
}
