// Note naming - frequency to nearest equal-tempered note and cent deviation

use std::fmt;

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const A4_FREQUENCY: f64 = 440.0;
const A4_MIDI: f64 = 69.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub note: &'static str,
    pub octave: i32,
    /// Deviation from the nearest note; in [-50, 50] by construction
    pub cents: f64,
    pub frequency: f64,
}

impl PitchEstimate {
    /// Nearest note for `frequency`; None for non-finite or non-positive input
    ///
    /// The continuous note number is rounded with `f64::round` (ties away from zero), so
    /// a pitch exactly halfway between two notes is named after the upper one and
    /// reported at -50 cents.
    pub fn from_frequency(frequency: f64) -> Option<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }

        let note_number = 12.0 * (frequency / A4_FREQUENCY).log2() + A4_MIDI;
        let index = note_number.round() as i64;
        let nearest = A4_FREQUENCY * 2f64.powf((index as f64 - A4_MIDI) / 12.0);

        Some(Self {
            note: NOTE_NAMES[index.rem_euclid(12) as usize],
            octave: (index.div_euclid(12) - 1) as i32,
            cents: 1200.0 * (frequency / nearest).log2(),
            frequency,
        })
    }

    /// MIDI-style note index (A4 = 69)
    pub fn note_index(&self) -> i64 {
        let pitch_class = NOTE_NAMES
            .iter()
            .position(|name| *name == self.note)
            .unwrap_or(0) as i64;
        (self.octave as i64 + 1) * 12 + pitch_class
    }
}

impl fmt::Display for PitchEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {:+.1}¢ ({:.1} Hz)",
            self.note, self.octave, self.cents, self.frequency
        )
    }
}
