// Metronome - runs the lookahead scheduler against the audio clock
//
// Two threads per run:
// - tick thread: wakes every tick interval, reads tempo/subdivision, schedules clicks
// - notifier thread: posts a Beat event once the audio clock reaches each beat
//
// Both exit on their shutdown channel and are joined by `stop()`, so no click can be
// queued and no beat can be reported after `stop()` returns.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select};

use crate::audio::clock::AudioClock;
use crate::audio::parameters::SharedParams;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::messaging::channels::{CommandSender, EventSender};
use crate::messaging::command::RenderCommand;
use crate::messaging::event::EngineEvent;
use crate::sequencer::scheduler::{LookaheadScheduler, ScheduledBeat};
use crate::sequencer::subdivision::SubdivisionRenderer;
use crate::synth::click::ClickSynth;

/// How often the notifier compares pending beats against the audio clock
const NOTIFY_POLL_INTERVAL: Duration = Duration::from_millis(2);

struct RunThreads {
    shutdown: Sender<()>,
    tick: JoinHandle<()>,
    notifier: JoinHandle<()>,
}

pub struct Metronome {
    params: SharedParams,
    clock: AudioClock,
    commands: CommandSender,
    events: EventSender,
    config: EngineConfig,
    running: Arc<AtomicBool>,
    threads: Option<RunThreads>,
}

impl Metronome {
    pub fn new(
        params: SharedParams,
        clock: AudioClock,
        commands: CommandSender,
        events: EventSender,
        config: EngineConfig,
    ) -> Self {
        Self {
            params,
            clock,
            commands,
            events,
            config,
            running: Arc::new(AtomicBool::new(false)),
            threads: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start generating beats; a no-op while already running
    pub fn start(&mut self) -> EngineResult<()> {
        if self.threads.is_some() {
            return Ok(());
        }

        let mut scheduler = LookaheadScheduler::new(
            self.config.scheduler,
            SubdivisionRenderer::new(self.config.click),
        );
        let mut clicks = ClickSynth::new(
            self.clock.clone(),
            self.commands.clone(),
            self.params.clone(),
        );

        let now = self.clock.now_seconds();
        scheduler.start(now);
        let first_beat_time = scheduler.next_event_time();
        // First pass runs here so the first beat never waits for a tick
        let first_beats = scheduler.tick(
            now,
            self.params.tempo(),
            self.params.subdivision(),
            &mut clicks,
        );

        self.running.store(true, Ordering::Release);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let (beat_tx, beat_rx) = crossbeam_channel::unbounded::<ScheduledBeat>();
        for beat in first_beats {
            let _ = beat_tx.send(beat);
        }

        let notifier = {
            let shutdown = shutdown_rx.clone();
            let clock = self.clock.clone();
            let events = self.events.clone();
            let running = Arc::clone(&self.running);
            std::thread::Builder::new()
                .name("metronome-notifier".to_string())
                .spawn(move || run_notifier(beat_rx, shutdown, clock, events, running))
        };
        let notifier = match notifier {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                let _ = self.commands.send(RenderCommand::CancelClicks);
                return Err(e.into());
            }
        };

        let tick = {
            let params = self.params.clone();
            let clock = self.clock.clone();
            let running = Arc::clone(&self.running);
            let interval = self.config.scheduler.tick_interval();
            std::thread::Builder::new()
                .name("metronome-scheduler".to_string())
                .spawn(move || {
                    let ticker = crossbeam_channel::tick(interval);
                    loop {
                        select! {
                            recv(shutdown_rx) -> _ => break,
                            recv(ticker) -> _ => {
                                if !running.load(Ordering::Acquire) {
                                    break;
                                }
                                let beats = scheduler.tick(
                                    clock.now_seconds(),
                                    params.tempo(),
                                    params.subdivision(),
                                    &mut clicks,
                                );
                                for beat in beats {
                                    if beat_tx.send(beat).is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                    log::debug!("[SCHEDULER] Tick thread exited");
                })
        };
        let tick = match tick {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                drop(shutdown_tx);
                let _ = notifier.join();
                let _ = self.commands.send(RenderCommand::CancelClicks);
                return Err(e.into());
            }
        };

        self.threads = Some(RunThreads {
            shutdown: shutdown_tx,
            tick,
            notifier,
        });
        log::info!(
            "[SCHEDULER] Started at {} ({}), first beat at {:.3}s",
            self.params.tempo(),
            self.params.subdivision(),
            first_beat_time
        );
        Ok(())
    }

    /// Stop generating beats; idempotent
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        let Some(threads) = self.threads.take() else {
            return;
        };

        // Dropping the sender disconnects both threads' shutdown receivers
        drop(threads.shutdown);
        if threads.tick.join().is_err() {
            log::error!("[SCHEDULER] Tick thread panicked");
        }
        if threads.notifier.join().is_err() {
            log::error!("[SCHEDULER] Notifier thread panicked");
        }

        if let Err(e) = self.commands.send(RenderCommand::CancelClicks) {
            log::warn!("[SCHEDULER] Could not cancel pending clicks: {}", e);
        }
        log::info!("[SCHEDULER] Stopped");
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Posts a Beat event when the audio clock reaches each scheduled beat, never before
fn run_notifier(
    beats: Receiver<ScheduledBeat>,
    shutdown: Receiver<()>,
    clock: AudioClock,
    events: EventSender,
    running: Arc<AtomicBool>,
) {
    let mut pending: VecDeque<ScheduledBeat> = VecDeque::new();
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(beats) -> beat => match beat {
                Ok(beat) => pending.push_back(beat),
                Err(_) => break,
            },
            default(NOTIFY_POLL_INTERVAL) => {}
        }

        let now = clock.now_seconds();
        while pending.front().is_some_and(|beat| beat.time <= now) {
            if !running.load(Ordering::Acquire) {
                return;
            }
            if let Some(beat) = pending.pop_front() {
                events.publish(EngineEvent::Beat { index: beat.index });
            }
        }
    }
}
