// Oscillators - waveform generators for clicks and tone voices

pub trait Oscillator {
    fn next_sample(&mut self) -> f32;
    fn set_frequency(&mut self, freq: f32);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Square,
    Saw,
}

/// Naive phase-accumulator oscillator, phase kept in [0, 1)
#[derive(Clone, Debug)]
pub struct SimpleOscillator {
    waveform: Waveform,
    phase: f32,
    phase_increment: f32,
    frequency: f32,
    sample_rate: f32,
}

impl SimpleOscillator {
    pub fn new(waveform: Waveform, frequency: f32, sample_rate: f32) -> Self {
        let mut osc = Self {
            waveform,
            phase: 0.0,
            phase_increment: 0.0,
            frequency: 0.0,
            sample_rate,
        };
        osc.set_frequency(frequency);
        osc
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }
}

impl Oscillator for SimpleOscillator {
    #[inline]
    fn next_sample(&mut self) -> f32 {
        let sample = match self.waveform {
            Waveform::Square => {
                if self.phase < 0.5 { 1.0 } else { -1.0 }
            }
            Waveform::Saw => (self.phase * 2.0) - 1.0,
        };

        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }

    fn set_frequency(&mut self, freq: f32) {
        self.frequency = freq.max(0.0);
        self.phase_increment = self.frequency / self.sample_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44100.0;
    const EPSILON: f32 = 0.001;

    #[test]
    fn test_oscillator_frequency() {
        let osc = SimpleOscillator::new(Waveform::Saw, 440.0, SAMPLE_RATE);
        assert!((osc.phase_increment - 440.0 / SAMPLE_RATE).abs() < EPSILON);
        assert_eq!(osc.frequency(), 440.0);
    }

    #[test]
    fn test_square_wave_levels() {
        let mut osc = SimpleOscillator::new(Waveform::Square, 1500.0, SAMPLE_RATE);
        for _ in 0..1000 {
            let sample = osc.next_sample();
            assert!(
                (sample - 1.0).abs() < EPSILON || (sample + 1.0).abs() < EPSILON,
                "Square wave sample not ±1.0: {}",
                sample
            );
        }
    }

    #[test]
    fn test_waveforms_stay_in_range() {
        for waveform in [Waveform::Square, Waveform::Saw] {
            let mut osc = SimpleOscillator::new(waveform, 261.63, SAMPLE_RATE);
            for _ in 0..2000 {
                let sample = osc.next_sample();
                assert!((-1.0..=1.0).contains(&sample), "{waveform:?}: {sample}");
            }
        }
    }

    #[test]
    fn test_phase_wrapping() {
        // Above Nyquist on purpose: increment > 1 must still wrap into [0, 1)
        let mut osc = SimpleOscillator::new(Waveform::Saw, 50000.0, SAMPLE_RATE);
        for _ in 0..1000 {
            osc.next_sample();
            assert!(osc.phase >= 0.0 && osc.phase < 1.0, "Phase out of range: {}", osc.phase);
        }
    }

    #[test]
    fn test_square_period_matches_frequency() {
        // 441 Hz at 44.1kHz: exactly 100 samples per period, 50 high then 50 low
        let mut osc = SimpleOscillator::new(Waveform::Square, 441.0, SAMPLE_RATE);
        let samples: Vec<f32> = (0..200).map(|_| osc.next_sample()).collect();
        let rising_edges = samples
            .windows(2)
            .filter(|w| w[0] < 0.0 && w[1] > 0.0)
            .count();
        assert_eq!(rising_edges, 1);
    }
}
