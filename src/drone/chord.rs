// Chords - fixed semitone-offset sets for the drone generator

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Highest MIDI note a drone voice may use
pub const MAX_MIDI_NOTE: u16 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chord {
    /// "M3"
    MajorTriad,
    /// "m3"
    MinorTriad,
    /// "Mm7"
    DominantSeventh,
    /// "Dim7"
    DiminishedSeventh,
    /// "5th"
    FifthStack,
    /// "8va"
    OctaveStack,
}

impl Chord {
    pub const ALL: [Chord; 6] = [
        Chord::MajorTriad,
        Chord::MinorTriad,
        Chord::DominantSeventh,
        Chord::DiminishedSeventh,
        Chord::FifthStack,
        Chord::OctaveStack,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Chord::MajorTriad => "M3",
            Chord::MinorTriad => "m3",
            Chord::DominantSeventh => "Mm7",
            Chord::DiminishedSeventh => "Dim7",
            Chord::FifthStack => "5th",
            Chord::OctaveStack => "8va",
        }
    }

    /// Semitones above the root, root included
    pub fn offsets(&self) -> &'static [u8] {
        match self {
            Chord::MajorTriad => &[0, 4, 7, 12],
            Chord::MinorTriad => &[0, 3, 7, 12],
            Chord::DominantSeventh => &[0, 4, 7, 10],
            Chord::DiminishedSeventh => &[0, 3, 6, 9],
            Chord::FifthStack => &[0, 7, 12, 24],
            Chord::OctaveStack => &[0, 12, 24],
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Chord {
    type Err = EngineError;

    /// Chord ids are case-sensitive: "M3" and "m3" differ
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chord::ALL
            .into_iter()
            .find(|chord| chord.id() == s.trim())
            .ok_or_else(|| EngineError::Config(format!("unknown chord '{}'", s)))
    }
}

/// Equal-tempered frequency of a MIDI note, A4 (69) = 440 Hz
pub fn midi_to_frequency(midi: u16) -> f32 {
    (440.0 * 2f64.powf((midi as f64 - 69.0) / 12.0)) as f32
}

/// Voice id of a drone note
pub fn voice_id(midi: u16) -> String {
    format!("midi-{}", midi)
}

/// (voice id, frequency) pairs for a root and optional chord; no chord means the root alone
pub fn drone_targets(root: u8, chord: Option<Chord>) -> Vec<(String, f32)> {
    let offsets: &[u8] = match chord {
        Some(chord) => chord.offsets(),
        None => &[0],
    };
    offsets
        .iter()
        .map(|offset| root as u16 + *offset as u16)
        .filter(|midi| *midi <= MAX_MIDI_NOTE)
        .map(|midi| (voice_id(midi), midi_to_frequency(midi)))
        .collect()
}
