// Pitch detection - time-domain autocorrelation
//
// Per frame:
// 1. RMS silence gate
// 2. trim both edges to the first sample (scanning inward) below the trim threshold
// 3. unnormalized autocorrelation c[i] = Σ buf[j]·buf[j+i]
// 4. skip the descending slope after lag 0, take the highest peak beyond it
// 5. parabolic interpolation around that peak
// 6. frequency = sample_rate / period
//
// The correlation buffer is reused between frames, so steady-state analysis does not
// allocate.

use crate::audio::dsp_utils::rms;
use crate::config::TunerConfig;

#[derive(Debug, Clone)]
pub struct PitchDetector {
    silence_rms: f32,
    trim_threshold: f32,
    correlation: Vec<f64>,
}

impl PitchDetector {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            silence_rms: config.silence_rms,
            trim_threshold: config.trim_threshold,
            correlation: Vec::with_capacity(config.buffer_size),
        }
    }

    /// Fundamental frequency of `frame` in Hz, or None for silence / no usable period
    pub fn detect(&mut self, frame: &[f32], sample_rate: f32) -> Option<f64> {
        if frame.len() < 4 || rms(frame) < self.silence_rms {
            return None;
        }

        let trimmed = trim_edges(frame, self.trim_threshold);
        let size = trimmed.len();
        if size < 3 {
            return None;
        }

        self.correlation.clear();
        self.correlation.extend((0..size).map(|lag| {
            trimmed[..size - lag]
                .iter()
                .zip(&trimmed[lag..])
                .map(|(a, b)| *a as f64 * *b as f64)
                .sum::<f64>()
        }));
        let c = &self.correlation;

        // Walk down from the zero-lag peak to the first local minimum
        let mut d = 0;
        while d + 1 < size && c[d] > c[d + 1] {
            d += 1;
        }
        if d + 1 >= size {
            return None;
        }

        let mut max_value = f64::NEG_INFINITY;
        let mut max_lag = d;
        for (lag, value) in c.iter().enumerate().skip(d) {
            if *value > max_value {
                max_value = *value;
                max_lag = lag;
            }
        }
        if max_lag == 0 || max_value <= 0.0 {
            return None;
        }

        let mut period = max_lag as f64;
        if max_lag + 1 < size {
            let (x1, x2, x3) = (c[max_lag - 1], c[max_lag], c[max_lag + 1]);
            let a = (x1 + x3 - 2.0 * x2) / 2.0;
            let b = (x3 - x1) / 2.0;
            if a != 0.0 {
                period -= b / (2.0 * a);
            }
        }

        let frequency = sample_rate as f64 / period;
        (frequency.is_finite() && frequency > 0.0).then_some(frequency)
    }
}

impl Default for PitchDetector {
    fn default() -> Self {
        Self::new(&TunerConfig::default())
    }
}

/// One-shot detection with the default thresholds
pub fn detect_pitch(frame: &[f32], sample_rate: f32) -> Option<f64> {
    PitchDetector::default().detect(frame, sample_rate)
}

/// Cut the frame down to the region between the first quiet sample of the first half and
/// the last quiet sample of the second half
fn trim_edges(frame: &[f32], threshold: f32) -> &[f32] {
    let size = frame.len();
    let half = size / 2;

    let start = (0..half)
        .find(|&i| frame[i].abs() < threshold)
        .unwrap_or(0);
    let end = (1..half)
        .map(|i| size - i)
        .find(|&i| frame[i].abs() < threshold)
        .unwrap_or(size - 1);

    &frame[start..end.max(start)]
}
