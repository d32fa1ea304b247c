// Tuner - microphone capture feeding a pitch-analysis thread
//
// The capture callback forwards mono blocks over a bounded channel; the analysis thread
// keeps the latest `buffer_size` samples and judges the window once per received block.
// Each reading stands alone: no smoothing across frames.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, select};

use crate::audio::capture::{CaptureHandle, Microphone};
use crate::config::TunerConfig;
use crate::error::EngineResult;
use crate::messaging::channels::EventSender;
use crate::messaging::event::{EngineEvent, TunerReading};
use crate::tuner::note::PitchEstimate;
use crate::tuner::pitch::PitchDetector;

/// Captured blocks waiting for analysis; older blocks are dropped by the capture side
const FRAME_CHANNEL_CAPACITY: usize = 32;

/// The most recent `size` samples of a stream
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: Vec<f32>,
    size: usize,
}

impl RollingWindow {
    pub fn new(size: usize) -> Self {
        Self {
            samples: Vec::with_capacity(size * 2),
            size: size.max(1),
        }
    }

    pub fn push(&mut self, block: &[f32]) {
        self.samples.extend_from_slice(block);
        if self.samples.len() > self.size {
            let excess = self.samples.len() - self.size;
            self.samples.drain(..excess);
        }
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.size
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }
}

/// Judge one analysis window
pub fn analyze(detector: &mut PitchDetector, window: &[f32], sample_rate: f32) -> TunerReading {
    match detector
        .detect(window, sample_rate)
        .and_then(PitchEstimate::from_frequency)
    {
        Some(estimate) => TunerReading::Detected(estimate),
        None => TunerReading::NoSignal,
    }
}

struct TunerSession {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
    // Declared last: the microphone is released after the thread has been joined
    capture: CaptureHandle,
}

pub struct Tuner {
    config: TunerConfig,
    events: EventSender,
    active: Arc<AtomicBool>,
    session: Option<TunerSession>,
}

impl Tuner {
    pub fn new(config: TunerConfig, events: EventSender) -> Self {
        Self {
            config,
            events,
            active: Arc::new(AtomicBool::new(false)),
            session: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Open the microphone and start analysing; a no-op while already running.
    /// If the microphone cannot be opened nothing is started.
    pub fn start(&mut self, microphone: &mut dyn Microphone) -> EngineResult<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_CHANNEL_CAPACITY);
        let capture = microphone.open(frame_tx)?;
        let sample_rate = capture.sample_rate() as f32;

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let config = self.config;
        let events = self.events.clone();
        let active = Arc::clone(&self.active);
        active.store(true, Ordering::Release);

        let thread = std::thread::Builder::new()
            .name("tuner-analysis".to_string())
            .spawn(move || {
                run_analysis(frame_rx, shutdown_rx, config, sample_rate, events, active)
            });
        let thread = match thread {
            Ok(thread) => thread,
            Err(e) => {
                self.active.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        log::info!("[TUNER] Started ({} Hz capture)", sample_rate);
        self.session = Some(TunerSession {
            shutdown: shutdown_tx,
            thread,
            capture,
        });
        Ok(())
    }

    /// Stop analysing and release the microphone; idempotent
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::Release);
        let Some(session) = self.session.take() else {
            return;
        };

        drop(session.shutdown);
        if session.thread.join().is_err() {
            log::error!("[TUNER] Analysis thread panicked");
        }
        let had_device = session.capture.has_device();
        drop(session.capture);
        log::info!(
            "[TUNER] Stopped{}",
            if had_device { ", microphone released" } else { "" }
        );
    }
}

impl Drop for Tuner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_analysis(
    frames: Receiver<Vec<f32>>,
    shutdown: Receiver<()>,
    config: TunerConfig,
    sample_rate: f32,
    events: EventSender,
    active: Arc<AtomicBool>,
) {
    let mut detector = PitchDetector::new(&config);
    let mut window = RollingWindow::new(config.buffer_size);

    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(frames) -> block => {
                let Ok(block) = block else {
                    log::debug!("[TUNER] Capture ended");
                    break;
                };
                window.push(&block);
                if !window.is_full() {
                    continue;
                }
                let reading = analyze(&mut detector, window.as_slice(), sample_rate);
                if !active.load(Ordering::Acquire) {
                    break;
                }
                events.publish(EngineEvent::Pitch(reading));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::capture::BufferedMicrophone;
    use crate::error::EngineError;
    use crate::messaging::channels::create_event_channel;
    use std::time::Duration;

    struct DeniedMicrophone;

    impl Microphone for DeniedMicrophone {
        fn open(&mut self, _frames: Sender<Vec<f32>>) -> EngineResult<CaptureHandle> {
            Err(EngineError::Microphone("permission denied".to_string()))
        }
    }

    #[test]
    fn test_rolling_window_keeps_latest() {
        let mut window = RollingWindow::new(4);
        window.push(&[1.0, 2.0, 3.0]);
        assert!(!window.is_full());
        window.push(&[4.0, 5.0]);
        assert!(window.is_full());
        assert_eq!(window.as_slice(), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_silent_window_reports_no_signal() {
        let mut detector = PitchDetector::default();
        assert_eq!(
            analyze(&mut detector, &[0.0; 2048], 44100.0),
            TunerReading::NoSignal
        );
    }

    #[test]
    fn test_denied_microphone_starts_nothing() {
        let (events, rx) = create_event_channel(16);
        let mut tuner = Tuner::new(TunerConfig::default(), events);
        let result = tuner.start(&mut DeniedMicrophone);
        assert!(matches!(result, Err(EngineError::Microphone(_))));
        assert!(!tuner.is_running());
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_buffered_sine_is_detected() {
        let (events, rx) = create_event_channel(64);
        let mut tuner = Tuner::new(TunerConfig::default(), events);
        let mut mic = BufferedMicrophone::sine(44100, 440.0, 0.8, 0.2, 512);
        tuner.start(&mut mic).unwrap();

        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        match event {
            EngineEvent::Pitch(TunerReading::Detected(estimate)) => {
                assert_eq!(estimate.note, "A");
                assert_eq!(estimate.octave, 4);
                assert!(estimate.cents.abs() < 1.0);
            }
            other => panic!("unexpected {:?}", other),
        }

        tuner.stop();
        tuner.stop();
        assert!(!tuner.is_running());
    }
}
