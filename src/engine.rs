// Engine - control surface for the metronome, tones, drone and tuner
//
// Lifecycle: new → initialize(output) → start/stop (any number of times) → dispose.
// Parameters (tempo, volume, subdivision) can be set at any point before dispose;
// anything that needs to make sound requires an initialized, active output.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, select};

use crate::audio::capture::{CpalMicrophone, Microphone};
use crate::audio::output::OutputHandle;
use crate::audio::parameters::SharedParams;
use crate::config::EngineConfig;
use crate::drone::chord::Chord;
use crate::drone::manager::{DroneChange, DroneManager};
use crate::error::{EngineError, EngineResult};
use crate::messaging::channels::{EventSender, create_event_channel};
use crate::messaging::event::EngineEvent;
use crate::sequencer::metronome::Metronome;
use crate::sequencer::tempo::{Subdivision, Tempo};
use crate::synth::tone_bank::{ToneBank, ToneControl};
use crate::tuner::analyzer::Tuner;

/// Forwards output stream errors to the event channel
struct ErrorForwarder {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl ErrorForwarder {
    fn spawn(errors: Receiver<String>, events: EventSender) -> EngineResult<Self> {
        let (shutdown, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let thread = std::thread::Builder::new()
            .name("engine-device-errors".to_string())
            .spawn(move || {
                loop {
                    select! {
                        recv(shutdown_rx) -> _ => break,
                        recv(errors) -> message => match message {
                            Ok(message) => events.publish(EngineEvent::DeviceError(message)),
                            Err(_) => break,
                        },
                    }
                }
            })?;
        Ok(Self { shutdown, thread })
    }

    fn stop(self) {
        drop(self.shutdown);
        let _ = self.thread.join();
    }
}

/// Everything that exists only while an output is attached
struct Session {
    output: OutputHandle,
    metronome: Metronome,
    tones: ToneBank,
    drone: DroneManager,
    errors: Option<ErrorForwarder>,
}

impl Session {
    fn shutdown(mut self) {
        self.metronome.stop();
        if let Err(e) = self.tones.stop_all_synth_tones() {
            log::warn!("[ENGINE] Could not stop tones: {}", e);
        }
        if let Err(e) = self.tones.toggle_tuning_note(false) {
            log::warn!("[ENGINE] Could not stop tuning tone: {}", e);
        }
        if let Some(errors) = self.errors.take() {
            errors.stop();
        }
        self.output.close();
    }
}

enum EngineState {
    Created,
    Ready(Box<Session>),
    Disposed,
}

pub struct Engine {
    config: EngineConfig,
    params: SharedParams,
    events_tx: EventSender,
    events_rx: Receiver<EngineEvent>,
    microphone: Box<dyn Microphone>,
    tuner: Tuner,
    state: EngineState,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let params = SharedParams::new(
            Tempo::new(config.tempo as i64),
            config.volume,
            config.subdivision,
        );
        let (events_tx, events_rx) = create_event_channel(config.channels.event_capacity);
        let microphone = Box::new(CpalMicrophone::new(config.tuner.sample_rate));
        let tuner = Tuner::new(config.tuner, events_tx.clone());

        Self {
            config,
            params,
            events_tx,
            events_rx,
            microphone,
            tuner,
            state: EngineState::Created,
        }
    }

    /// Replace the microphone used by `start_tuner`
    pub fn with_microphone(mut self, microphone: Box<dyn Microphone>) -> Self {
        self.microphone = microphone;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receiver for beat, pitch and device events
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.events_rx.clone()
    }

    fn check_not_disposed(&self) -> EngineResult<()> {
        match self.state {
            EngineState::Disposed => Err(EngineError::Disposed),
            _ => Ok(()),
        }
    }

    fn session(&mut self) -> EngineResult<&mut Session> {
        match &mut self.state {
            EngineState::Created => Err(EngineError::NotInitialized),
            EngineState::Ready(session) => Ok(session.as_mut()),
            EngineState::Disposed => Err(EngineError::Disposed),
        }
    }

    /// Session with a running output, resuming it first if needed
    fn active_session(&mut self) -> EngineResult<&mut Session> {
        let session = self.session()?;
        session.output.ensure_active()?;
        Ok(session)
    }

    /// Attach an output; a previously attached output is shut down first
    pub fn initialize(&mut self, mut output: OutputHandle) -> EngineResult<()> {
        self.check_not_disposed()?;
        if let EngineState::Ready(previous) =
            std::mem::replace(&mut self.state, EngineState::Created)
        {
            log::info!("[ENGINE] Replacing output");
            Session::shutdown(*previous);
        }

        let errors = match output.take_errors() {
            Some(errors) => Some(ErrorForwarder::spawn(errors, self.events_tx.clone())?),
            None => None,
        };
        let metronome = Metronome::new(
            self.params.clone(),
            output.clock().clone(),
            output.commands().clone(),
            self.events_tx.clone(),
            self.config.clone(),
        );
        let tones = ToneBank::new(
            output.commands().clone(),
            self.params.clone(),
            self.config.tones,
        );

        log::info!("[ENGINE] Initialized at {} Hz", output.sample_rate());
        self.state = EngineState::Ready(Box::new(Session {
            output,
            metronome,
            tones,
            drone: DroneManager::new(),
            errors,
        }));
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, EngineState::Disposed)
    }

    // ---- Metronome ----

    /// Set the tempo, clamped to [10, 999]; applies from the next scheduled beat
    pub fn set_tempo(&mut self, bpm: i64) -> EngineResult<Tempo> {
        self.check_not_disposed()?;
        let tempo = Tempo::new(bpm);
        self.params.set_tempo(tempo);
        Ok(tempo)
    }

    pub fn tempo(&self) -> Tempo {
        self.params.tempo()
    }

    /// Set the volume, clamped to [0, 1]; sounding tones glide to the new level.
    /// The new volume applies to clicks even if some tone gains could not be queued.
    pub fn set_volume(&mut self, volume: f32) -> EngineResult<f32> {
        self.check_not_disposed()?;
        let applied = self.params.set_volume(volume);
        if let EngineState::Ready(session) = &mut self.state {
            if let Err(e) = session.tones.retarget_volume() {
                log::warn!("[ENGINE] Volume {} applied, tone gains not updated: {}", applied, e);
            }
        }
        Ok(applied)
    }

    pub fn volume(&self) -> f32 {
        self.params.volume()
    }

    pub fn set_subdivision(&mut self, subdivision: Subdivision) -> EngineResult<()> {
        self.check_not_disposed()?;
        self.params.set_subdivision(subdivision);
        Ok(())
    }

    pub fn subdivision(&self) -> Subdivision {
        self.params.subdivision()
    }

    pub fn start(&mut self) -> EngineResult<()> {
        self.active_session()?.metronome.start()
    }

    /// Stop the metronome; stopping a stopped, never started or disposed engine is a no-op
    pub fn stop(&mut self) -> EngineResult<()> {
        if let EngineState::Ready(session) = &mut self.state {
            session.metronome.stop();
        }
        Ok(())
    }

    /// Start if stopped, stop if running; returns whether the metronome is now playing
    pub fn toggle(&mut self) -> EngineResult<bool> {
        if self.is_playing() {
            self.stop()?;
            Ok(false)
        } else {
            self.start()?;
            Ok(true)
        }
    }

    pub fn is_playing(&self) -> bool {
        match &self.state {
            EngineState::Ready(session) => session.metronome.is_running(),
            _ => false,
        }
    }

    // ---- Tones ----

    /// Start the tone `id`; calling it again for a sounding id stops it.
    /// Returns whether the tone is sounding afterwards.
    pub fn play_synth_tone(&mut self, id: &str, frequency: f32) -> EngineResult<bool> {
        self.active_session()?.tones.play_synth_tone(id, frequency)
    }

    pub fn stop_synth_tone(&mut self, id: &str) -> EngineResult<()> {
        match &mut self.state {
            EngineState::Ready(session) => session.tones.stop_synth_tone(id),
            _ => Ok(()),
        }
    }

    /// Stop every synth and drone tone (the tuning tone is left alone)
    pub fn stop_all_synth_tones(&mut self) -> EngineResult<()> {
        match &mut self.state {
            EngineState::Ready(session) => session.tones.stop_all_synth_tones(),
            _ => Ok(()),
        }
    }

    pub fn is_tone_playing(&self, id: &str) -> bool {
        match &self.state {
            EngineState::Ready(session) => session.tones.is_playing(id),
            _ => false,
        }
    }

    pub fn playing_tone_ids(&self) -> Vec<String> {
        match &self.state {
            EngineState::Ready(session) => session.tones.active_ids(),
            _ => Vec::new(),
        }
    }

    pub fn toggle_tuning_note(&mut self, enable: bool) -> EngineResult<()> {
        let session = if enable {
            self.active_session()?
        } else {
            match &mut self.state {
                EngineState::Ready(session) => session.as_mut(),
                _ => return Ok(()),
            }
        };
        session.tones.toggle_tuning_note(enable)
    }

    pub fn is_tuning_note_playing(&self) -> bool {
        match &self.state {
            EngineState::Ready(session) => session.tones.is_tuning_playing(),
            _ => false,
        }
    }

    /// Make the drone sound `root` + `chord`; `root == None` silences it
    pub fn set_drone_target(
        &mut self,
        root: Option<u8>,
        chord: Option<Chord>,
    ) -> EngineResult<DroneChange> {
        let session = if root.is_some() {
            self.active_session()?
        } else {
            match &mut self.state {
                EngineState::Ready(session) => session.as_mut(),
                _ => return Ok(DroneChange::default()),
            }
        };
        session.drone.set_target(root, chord, &mut session.tones)
    }

    // ---- Tuner ----

    /// Start pitch analysis; readings arrive as `EngineEvent::Pitch`
    pub fn start_tuner(&mut self) -> EngineResult<()> {
        self.check_not_disposed()?;
        self.tuner.start(self.microphone.as_mut())
    }

    pub fn stop_tuner(&mut self) -> EngineResult<()> {
        self.tuner.stop();
        Ok(())
    }

    pub fn is_tuner_running(&self) -> bool {
        self.tuner.is_running()
    }

    // ---- Lifecycle ----

    /// Stop everything and release the devices; later calls that would make sound
    /// return `Disposed`, stop calls stay no-ops
    pub fn dispose(&mut self) {
        match std::mem::replace(&mut self.state, EngineState::Disposed) {
            EngineState::Disposed => return,
            EngineState::Ready(session) => Session::shutdown(*session),
            EngineState::Created => {}
        }
        self.tuner.stop();
        log::info!("[ENGINE] Disposed");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dispose();
    }
}
