// Sequencer - tempo, subdivisions and the lookahead metronome

pub mod metronome;
pub mod scheduler;
pub mod subdivision;
pub mod tempo;

pub use metronome::Metronome;
pub use scheduler::{LookaheadScheduler, ScheduledBeat};
pub use subdivision::SubdivisionRenderer;
pub use tempo::{Subdivision, Tempo};
