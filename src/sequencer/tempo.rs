// Tempo and subdivision - the musical parameters the scheduler reads on every beat

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tempo in integer BPM, always inside [MIN_BPM, MAX_BPM]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tempo {
    bpm: u16,
}

impl Tempo {
    pub const MIN_BPM: u16 = 10;
    pub const MAX_BPM: u16 = 999;
    pub const DEFAULT_BPM: u16 = 60;

    /// Creates a tempo, clamping out-of-range values to the nearest bound
    pub fn new(bpm: i64) -> Self {
        let clamped = bpm.clamp(Self::MIN_BPM as i64, Self::MAX_BPM as i64);
        Self { bpm: clamped as u16 }
    }

    pub fn bpm(&self) -> u16 {
        self.bpm
    }

    /// Duration of one beat in seconds (60 / bpm)
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    /// Duration of one beat in samples at given sample rate
    pub fn beat_duration_samples(&self, sample_rate: f64) -> f64 {
        self.beat_duration_seconds() * sample_rate
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BPM as i64)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}

/// Rhythmic pattern of secondary clicks inside one beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Subdivision {
    #[default]
    Quarter,
    Eighth,
    EighthTriplet,
    Sixteenth,
    /// Dotted eighth + sixteenth: one extra click on the last sixteenth
    Dotted,
}

impl Subdivision {
    pub const ALL: [Subdivision; 5] = [
        Subdivision::Quarter,
        Subdivision::Eighth,
        Subdivision::EighthTriplet,
        Subdivision::Sixteenth,
        Subdivision::Dotted,
    ];

    /// Fractional beat offsets (0 < offset < 1) of the secondary clicks
    pub fn offsets(&self) -> &'static [f64] {
        match self {
            Subdivision::Quarter => &[],
            Subdivision::Eighth => &[0.5],
            Subdivision::EighthTriplet => &[1.0 / 3.0, 2.0 / 3.0],
            Subdivision::Sixteenth => &[0.25, 0.5, 0.75],
            Subdivision::Dotted => &[0.75],
        }
    }

    /// Short label used by the control surface
    pub fn label(&self) -> &'static str {
        match self {
            Subdivision::Quarter => "1/4",
            Subdivision::Eighth => "1/8",
            Subdivision::EighthTriplet => "1/8T",
            Subdivision::Sixteenth => "1/16",
            Subdivision::Dotted => "dotted",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Subdivision::Quarter => 0,
            Subdivision::Eighth => 1,
            Subdivision::EighthTriplet => 2,
            Subdivision::Sixteenth => 3,
            Subdivision::Dotted => 4,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Subdivision::Eighth,
            2 => Subdivision::EighthTriplet,
            3 => Subdivision::Sixteenth,
            4 => Subdivision::Dotted,
            _ => Subdivision::Quarter,
        }
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Subdivision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subdivision::ALL
            .into_iter()
            .find(|sub| sub.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown subdivision '{}' (expected 1/4, 1/8, 1/8T, 1/16, dotted)", s))
    }
}
