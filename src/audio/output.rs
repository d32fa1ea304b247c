// Audio output - the device the engine renders into
//
// # Format Support
//
// The cpal backend picks the device's preferred sample format and builds the stream
// for it: F32 natively, I16 and U16 through cpal's `FromSample<f32>` conversion when
// the mono mix is written to each interleaved frame. Rendering stays f32 internally.
//
// # Stream Limitations
//
// On macOS (CoreAudio) `cpal::Stream` is neither Send nor Sync, so the handle that owns
// it must stay on the thread that created it. The error callback only flips the device
// status and forwards a message; resuming happens on the next control operation.
//
// The offline backend has no device: a test or the demo binary pumps the renderer by
// hand and the audio clock advances exactly as far as it has rendered.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};

use crate::audio::clock::AudioClock;
use crate::audio::device::AudioDeviceManager;
use crate::audio::renderer::Renderer;
use crate::config::EngineConfig;
use crate::connection::status::{AtomicDeviceStatus, DeviceStatus};
use crate::error::{EngineError, EngineResult};
use crate::messaging::channels::{CommandSender, create_command_channel};

/// Capacity of the device error channel; older errors are dropped when it is full
const ERROR_CHANNEL_CAPACITY: usize = 16;

/// Control-side view of an open output
pub struct OutputHandle {
    clock: AudioClock,
    commands: CommandSender,
    status: AtomicDeviceStatus,
    errors: Option<Receiver<String>>,
    stream: Option<Stream>,
}

impl OutputHandle {
    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    pub fn commands(&self) -> &CommandSender {
        &self.commands
    }

    pub fn status(&self) -> &AtomicDeviceStatus {
        &self.status
    }

    pub fn sample_rate(&self) -> f32 {
        self.clock.sample_rate()
    }

    /// Device error messages reported by the stream; can be taken once
    pub fn take_errors(&mut self) -> Option<Receiver<String>> {
        self.errors.take()
    }

    /// Make sure events sent now will be rendered, resuming the stream if needed
    pub fn ensure_active(&self) -> EngineResult<()> {
        let status = self.status.get();
        if status.is_active() {
            return Ok(());
        }

        match &self.stream {
            Some(stream) => {
                stream
                    .play()
                    .map_err(|e| EngineError::Device(format!("cannot resume stream: {}", e)))?;
                log::info!("[AUDIO] Output resumed (was {:?})", status);
            }
            None if status == DeviceStatus::Suspended => {
                log::info!("[AUDIO] Offline output resumed");
            }
            None => {
                return Err(EngineError::Device(format!(
                    "output is {:?} and cannot be resumed",
                    status
                )));
            }
        }
        self.status.set(DeviceStatus::Connected);
        Ok(())
    }

    /// Pause the output; the next `ensure_active` resumes it
    pub fn suspend(&self) -> EngineResult<()> {
        if let Some(stream) = &self.stream {
            stream
                .pause()
                .map_err(|e| EngineError::Device(format!("cannot pause stream: {}", e)))?;
        }
        self.status.set(DeviceStatus::Suspended);
        Ok(())
    }

    /// Stop rendering and release the device
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            log::info!("[AUDIO] Output stream closed");
        }
        self.status.set(DeviceStatus::Disconnected);
    }
}

/// Open the default output device (or the named one) and start rendering
pub fn open_default_output(config: &EngineConfig) -> EngineResult<OutputHandle> {
    let manager = AudioDeviceManager::new();
    let device = manager
        .default_output_device()
        .ok_or_else(|| EngineError::Device("no output device found".to_string()))?;
    open_output_device(device, config)
}

pub fn open_named_output(name: &str, config: &EngineConfig) -> EngineResult<OutputHandle> {
    let manager = AudioDeviceManager::new();
    let device = manager
        .output_device_by_name(name)
        .ok_or_else(|| EngineError::Device(format!("output device '{}' not found", name)))?;
    open_output_device(device, config)
}

fn open_output_device(device: Device, config: &EngineConfig) -> EngineResult<OutputHandle> {
    log::info!(
        "[AUDIO] Output device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let supported_config = device
        .default_output_config()
        .map_err(|e| EngineError::Device(format!("configuration error: {}", e)))?;
    let sample_format = supported_config.sample_format();
    let sample_rate = supported_config.sample_rate().0 as f32;
    let channels = supported_config.channels() as usize;
    log::debug!("[AUDIO] Config: {:?}", supported_config);

    let stream_config: StreamConfig = supported_config.into();

    let clock = AudioClock::new(sample_rate);
    let (commands, consumer) = create_command_channel(config.channels.command_capacity);
    let renderer = Renderer::new(consumer, clock.clone(), config);
    let status = AtomicDeviceStatus::new(DeviceStatus::Connecting);
    let (error_tx, error_rx) = crossbeam_channel::bounded(ERROR_CHANNEL_CAPACITY);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(
            &device,
            &stream_config,
            channels,
            renderer,
            status.clone(),
            error_tx,
        ),
        SampleFormat::I16 => build_stream::<i16>(
            &device,
            &stream_config,
            channels,
            renderer,
            status.clone(),
            error_tx,
        ),
        SampleFormat::U16 => build_stream::<u16>(
            &device,
            &stream_config,
            channels,
            renderer,
            status.clone(),
            error_tx,
        ),
        _ => {
            return Err(EngineError::Device(format!(
                "unsupported sample format: {:?}. Supported formats: F32, I16, U16",
                sample_format
            )));
        }
    }?;

    stream
        .play()
        .map_err(|e| EngineError::Device(format!("cannot start stream: {}", e)))?;
    status.set(DeviceStatus::Connected);
    log::info!("[AUDIO] Output started: {} Hz, {} channels", sample_rate, channels);

    Ok(OutputHandle {
        clock,
        commands,
        status,
        errors: Some(error_rx),
        stream: Some(stream),
    })
}

/// Build an output stream for any sample type, converting from the f32 mix
fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    channels: usize,
    mut renderer: Renderer,
    status: AtomicDeviceStatus,
    errors: Sender<String>,
) -> EngineResult<Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                renderer.process_interleaved(data, channels);
            },
            move |err| {
                // Runs outside the render callback, I/O is fine here
                log::error!("[AUDIO] Stream error: {}", err);
                status.set(DeviceStatus::Error);
                let _ = errors.try_send(err.to_string());
            },
            None,
        )
        .map_err(|e| EngineError::Device(format!("cannot create stream: {}", e)))
}

/// Manually pumped renderer paired with an offline `OutputHandle`
pub struct OfflineRenderer {
    renderer: Renderer,
    status: AtomicDeviceStatus,
    errors: Sender<String>,
}

impl OfflineRenderer {
    /// Render `frames` mono samples
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; frames];
        self.render_into(&mut buffer);
        buffer
    }

    /// Render into an existing buffer; a suspended or failed output renders silence
    /// without advancing the clock
    pub fn render_into(&mut self, buffer: &mut [f32]) {
        if self.status.get().is_active() {
            self.renderer.process_into(buffer);
        } else {
            buffer.fill(0.0);
        }
    }

    /// Render in fixed-size blocks until `seconds` of audio have been produced
    pub fn render_seconds(&mut self, seconds: f64, block: usize) -> Vec<f32> {
        let total = (seconds * self.renderer.clock().sample_rate() as f64).round() as usize;
        let mut out = Vec::with_capacity(total);
        let mut buffer = vec![0.0; block.max(1)];
        while out.len() < total {
            let n = buffer.len().min(total - out.len());
            self.render_into(&mut buffer[..n]);
            out.extend_from_slice(&buffer[..n]);
        }
        out
    }

    pub fn clock(&self) -> &AudioClock {
        self.renderer.clock()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Behave like a failing device: mark the output unusable and report the error
    pub fn fail(&self, message: &str) {
        self.status.set(DeviceStatus::Error);
        let _ = self.errors.try_send(message.to_string());
    }

    /// Bring a failed output back
    pub fn recover(&self) {
        self.status.set(DeviceStatus::Connected);
    }
}

/// An output without a device, for tests and headless rendering
pub fn offline(sample_rate: f32, config: &EngineConfig) -> (OutputHandle, OfflineRenderer) {
    let clock = AudioClock::new(sample_rate);
    let (commands, consumer) = create_command_channel(config.channels.command_capacity);
    let renderer = Renderer::new(consumer, clock.clone(), config);
    let status = AtomicDeviceStatus::new(DeviceStatus::Connected);
    let (error_tx, error_rx) = crossbeam_channel::bounded(ERROR_CHANNEL_CAPACITY);

    (
        OutputHandle {
            clock,
            commands,
            status: status.clone(),
            errors: Some(error_rx),
            stream: None,
        },
        OfflineRenderer {
            renderer,
            status,
            errors: error_tx,
        },
    )
}
