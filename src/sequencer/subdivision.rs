// Subdivision renderer - one beat's main click plus its secondary clicks

use crate::config::ClickConfig;
use crate::sequencer::tempo::Subdivision;
use crate::synth::click::{ClickSink, ScheduledClick};

#[derive(Debug, Clone, Copy)]
pub struct SubdivisionRenderer {
    config: ClickConfig,
}

impl SubdivisionRenderer {
    pub fn new(config: ClickConfig) -> Self {
        Self { config }
    }

    /// Schedule the main click at `beat_time` and one subdivision click per offset of
    /// `subdivision`, spaced over `beat_duration` seconds. Returns the number of clicks.
    pub fn render_beat<S: ClickSink + ?Sized>(
        &self,
        beat_time: f64,
        beat_duration: f64,
        subdivision: Subdivision,
        sink: &mut S,
    ) -> usize {
        // Every main beat sounds the same, there is no bar accent
        sink.play_click(ScheduledClick::main(beat_time, &self.config));

        let offsets = subdivision.offsets();
        for offset in offsets {
            sink.play_click(ScheduledClick::subdivision(
                beat_time + offset * beat_duration,
                &self.config,
            ));
        }
        1 + offsets.len()
    }
}

impl Default for SubdivisionRenderer {
    fn default() -> Self {
        Self::new(ClickConfig::default())
    }
}
