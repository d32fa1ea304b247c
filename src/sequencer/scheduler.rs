// Lookahead scheduler - the timing core
//
// Pure state machine: each tick is given the current device time and schedules every
// beat that falls inside the look-ahead window. Beat times advance by exactly 60/tempo
// from the previous beat, using the tempo in effect when that beat is scheduled, so the
// grid never depends on when the control thread happened to wake up.

use crate::config::SchedulerConfig;
use crate::sequencer::subdivision::SubdivisionRenderer;
use crate::sequencer::tempo::{Subdivision, Tempo};
use crate::synth::click::ClickSink;

/// A main beat handed to the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBeat {
    pub index: u64,
    /// Device time in seconds
    pub time: f64,
}

#[derive(Debug, Clone)]
pub struct LookaheadScheduler {
    config: SchedulerConfig,
    renderer: SubdivisionRenderer,
    running: bool,
    next_event_time: f64,
    beat_index: u64,
}

impl LookaheadScheduler {
    pub fn new(config: SchedulerConfig, renderer: SubdivisionRenderer) -> Self {
        Self {
            config,
            renderer,
            running: false,
            next_event_time: 0.0,
            beat_index: 0,
        }
    }

    /// Arm the scheduler; the first beat sounds `start_delay` after `now`.
    /// Returns false (and changes nothing) if it was already running.
    pub fn start(&mut self, now: f64) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.beat_index = 0;
        self.next_event_time = now + self.config.start_delay_secs();
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    pub fn beat_index(&self) -> u64 {
        self.beat_index
    }

    /// Schedule every beat with `next_event_time < now + schedule_ahead`
    pub fn tick<S: ClickSink + ?Sized>(
        &mut self,
        now: f64,
        tempo: Tempo,
        subdivision: Subdivision,
        sink: &mut S,
    ) -> Vec<ScheduledBeat> {
        let mut beats = Vec::new();
        if !self.running {
            return beats;
        }

        let beat_duration = tempo.beat_duration_seconds();
        let late_by = now - self.next_event_time;
        if late_by > self.config.tick_interval_secs() {
            // Stalled control thread: stay on the grid, never burst the missed beats
            let missed = (late_by / beat_duration).ceil();
            self.next_event_time += missed * beat_duration;
            self.beat_index += missed as u64;
            log::warn!(
                "[SCHEDULER] Tick {:.1} ms late, skipped {} beat(s)",
                late_by * 1000.0,
                missed
            );
        }

        let horizon = now + self.config.schedule_ahead_secs();
        while self.next_event_time < horizon {
            self.renderer
                .render_beat(self.next_event_time, beat_duration, subdivision, sink);
            beats.push(ScheduledBeat {
                index: self.beat_index,
                time: self.next_event_time,
            });
            self.next_event_time += beat_duration;
            self.beat_index += 1;
        }
        beats
    }
}
