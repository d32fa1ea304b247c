// DSP utilities - audio hygiene and parameter smoothing
//
// Helpers shared by the render callback (denormal flushing, soft clipping,
// gain smoothing) and the tuner (RMS).

/// Flush denormals to zero
///
/// Values very close to 0 can slow some CPUs down considerably. Threshold 1e-15
/// sits far below 32-bit float noise.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Soft clipping with tanh
///
/// Keeps the mixed output inside [-1, 1] when several clicks and tones overlap.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// Root mean square of a block of samples (0.0 for an empty block)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// One-pole smoother (first-order low-pass on a parameter)
///
/// y[n] = y[n-1] + α * (x[n] - y[n-1])
///
/// Used to glide a voice's gain toward a new target after a volume change,
/// the way an exponential "set target at time" ramp behaves.
#[derive(Debug, Clone)]
pub struct OnePoleSmoother {
    current: f32,
    coefficient: f32,
}

impl OnePoleSmoother {
    /// * `initial_value` - starting value
    /// * `time_constant_ms` - time to cover ~63% of a step
    /// * `sample_rate` - sample rate in Hz
    ///
    /// ```
    /// use mymusic_metronome::audio::dsp_utils::OnePoleSmoother;
    /// let smoother = OnePoleSmoother::new(0.5, 100.0, 44100.0);
    /// assert_eq!(smoother.get(), 0.5);
    /// ```
    pub fn new(initial_value: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        let time_constant_samples = (time_constant_ms * 0.001 * sample_rate).max(1.0);
        // α = 1 - e^(-1/τ)
        let coefficient = 1.0 - (-1.0 / time_constant_samples).exp();

        Self {
            current: initial_value,
            coefficient: coefficient.min(1.0),
        }
    }

    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.current += self.coefficient * (target - self.current);
        self.current = flush_denormals_to_zero(self.current);
        self.current
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }
}
