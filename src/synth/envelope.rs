// Envelopes - amplitude shaping for tone voices and clicks
//
// `LinearFade` gives tone voices click-free starts and stops (short linear ramps).
// `ExponentialDecay` shapes metronome clicks: full gain on the start sample, then an
// exponential fall toward a floor that is never reached, then release.

/// State of a linear fade envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    /// Silent, nothing to render
    Idle,
    /// Ramping up toward 1.0
    FadingIn,
    /// Holding at 1.0
    Holding,
    /// Ramping down toward 0.0; becomes Idle when it gets there
    FadingOut,
}

/// Linear fade-in / fade-out envelope
#[derive(Debug, Clone)]
pub struct LinearFade {
    state: FadeState,
    current_value: f32,
    step: f32,
    sample_rate: f32,
}

impl LinearFade {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            state: FadeState::Idle,
            current_value: 0.0,
            step: 0.0,
            sample_rate,
        }
    }

    /// Ramp from the current value up to 1.0 over `seconds`
    pub fn fade_in(&mut self, seconds: f32) {
        let samples = seconds * self.sample_rate;
        if samples < 1.0 {
            self.current_value = 1.0;
            self.state = FadeState::Holding;
            return;
        }
        self.step = (1.0 - self.current_value) / samples;
        self.state = FadeState::FadingIn;
    }

    /// Ramp from the current value down to 0.0 over `seconds`
    pub fn fade_out(&mut self, seconds: f32) {
        if matches!(self.state, FadeState::Idle) {
            return;
        }
        let samples = seconds * self.sample_rate;
        if samples < 1.0 || self.current_value <= 0.0 {
            self.current_value = 0.0;
            self.state = FadeState::Idle;
            return;
        }
        self.step = self.current_value / samples;
        self.state = FadeState::FadingOut;
    }

    /// Returns the envelope value for this sample, then advances
    #[inline]
    pub fn process(&mut self) -> f32 {
        let value = self.current_value;
        match self.state {
            FadeState::Idle | FadeState::Holding => {}
            FadeState::FadingIn => {
                self.current_value += self.step;
                if self.current_value >= 1.0 {
                    self.current_value = 1.0;
                    self.state = FadeState::Holding;
                }
            }
            FadeState::FadingOut => {
                self.current_value -= self.step;
                if self.current_value <= 0.0 {
                    self.current_value = 0.0;
                    self.state = FadeState::Idle;
                }
            }
        }
        value
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, FadeState::Idle)
    }

    pub fn is_fading_out(&self) -> bool {
        matches!(self.state, FadeState::FadingOut)
    }

    pub fn current_value(&self) -> f32 {
        self.current_value
    }
}

/// Exponential decay from a peak to a floor, an optional hold at the floor, then silence
#[derive(Debug, Clone)]
pub struct ExponentialDecay {
    current_value: f32,
    floor: f32,
    factor: f32,
    decay_remaining: u32,
    hold_remaining: u32,
}

impl ExponentialDecay {
    /// The level the decay approaches; the click is released shortly after reaching it
    pub const FLOOR: f32 = 0.001;

    /// An envelope that has already finished
    pub fn idle() -> Self {
        Self {
            current_value: 0.0,
            floor: Self::FLOOR,
            factor: 1.0,
            decay_remaining: 0,
            hold_remaining: 0,
        }
    }

    /// Start at `peak` and decay toward `floor` over `decay_samples`, then hold `hold_samples`
    ///
    /// A peak at or below the floor produces an idle envelope.
    pub fn new(peak: f32, floor: f32, decay_samples: u32, hold_samples: u32) -> Self {
        if peak <= floor || decay_samples == 0 {
            return Self::idle();
        }
        // peak * factor^decay_samples == floor
        let factor = (floor / peak).powf(1.0 / decay_samples as f32);
        Self {
            current_value: peak,
            floor,
            factor,
            decay_remaining: decay_samples,
            hold_remaining: hold_samples,
        }
    }

    #[inline]
    pub fn process(&mut self) -> f32 {
        if self.decay_remaining > 0 {
            let value = self.current_value;
            self.current_value *= self.factor;
            self.decay_remaining -= 1;
            if self.decay_remaining == 0 {
                self.current_value = self.floor;
            }
            value
        } else if self.hold_remaining > 0 {
            self.hold_remaining -= 1;
            self.floor
        } else {
            0.0
        }
    }

    pub fn is_active(&self) -> bool {
        self.decay_remaining > 0 || self.hold_remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SAMPLE_RATE: f32 = 48000.0;

    #[test]
    fn test_fade_starts_idle() {
        let fade = LinearFade::new(TEST_SAMPLE_RATE);
        assert_eq!(fade.state(), FadeState::Idle);
        assert_eq!(fade.current_value(), 0.0);
        assert!(!fade.is_active());
    }

    #[test]
    fn test_fade_in_is_linear() {
        let mut fade = LinearFade::new(TEST_SAMPLE_RATE);
        fade.fade_in(0.02); // 960 samples

        assert_eq!(fade.process(), 0.0);
        for _ in 0..479 {
            fade.process();
        }
        assert!((fade.current_value() - 0.5).abs() < 0.01);

        for _ in 0..500 {
            fade.process();
        }
        assert_eq!(fade.state(), FadeState::Holding);
        assert_eq!(fade.current_value(), 1.0);
    }

    #[test]
    fn test_fade_out_reaches_idle() {
        let mut fade = LinearFade::new(TEST_SAMPLE_RATE);
        fade.fade_in(0.0);
        assert_eq!(fade.state(), FadeState::Holding);

        fade.fade_out(0.05); // 2400 samples
        assert!(fade.is_fading_out());
        for _ in 0..2399 {
            fade.process();
        }
        assert!(fade.is_active());
        for _ in 0..10 {
            fade.process();
        }
        assert_eq!(fade.state(), FadeState::Idle);
        assert_eq!(fade.current_value(), 0.0);
    }

    #[test]
    fn test_fade_out_during_fade_in_starts_from_current_value() {
        let mut fade = LinearFade::new(TEST_SAMPLE_RATE);
        fade.fade_in(0.1);
        for _ in 0..1200 {
            fade.process();
        }
        let reached = fade.current_value();
        assert!(reached > 0.2 && reached < 0.3);

        fade.fade_out(0.05);
        let first = fade.process();
        assert!((first - reached).abs() < 1e-6);
        assert!(fade.current_value() < reached);
    }

    #[test]
    fn test_fade_out_on_idle_is_noop() {
        let mut fade = LinearFade::new(TEST_SAMPLE_RATE);
        fade.fade_out(0.05);
        assert_eq!(fade.state(), FadeState::Idle);
    }

    #[test]
    fn test_decay_starts_at_peak_and_reaches_floor() {
        let decay_samples = (0.03 * TEST_SAMPLE_RATE) as u32;
        let hold_samples = (0.01 * TEST_SAMPLE_RATE) as u32;
        let mut env = ExponentialDecay::new(0.8, ExponentialDecay::FLOOR, decay_samples, hold_samples);

        assert_eq!(env.process(), 0.8);

        let mut previous = 0.8;
        for _ in 1..decay_samples {
            let value = env.process();
            assert!(value < previous, "decay must be strictly decreasing");
            assert!(value > ExponentialDecay::FLOOR * 0.999);
            previous = value;
        }

        // Hold at the floor, then release
        for _ in 0..hold_samples {
            assert_eq!(env.process(), ExponentialDecay::FLOOR);
        }
        assert!(!env.is_active());
        assert_eq!(env.process(), 0.0);
    }

    #[test]
    fn test_decay_halfway_is_geometric_mean() {
        let mut env = ExponentialDecay::new(1.0, 0.001, 1000, 0);
        let mut value = 0.0;
        for _ in 0..=500 {
            value = env.process();
        }
        // sqrt(1.0 * 0.001)
        assert!((value - 0.0316).abs() < 0.001, "value = {value}");
    }

    #[test]
    fn test_decay_below_floor_is_idle() {
        let mut env = ExponentialDecay::new(0.0005, ExponentialDecay::FLOOR, 1440, 480);
        assert!(!env.is_active());
        assert_eq!(env.process(), 0.0);
    }
}
