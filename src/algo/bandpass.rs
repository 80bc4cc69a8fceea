use serde::{Deserialize, Serialize};

/// Band-pass approximation built from two one-pole exponential moving
/// averages. `fast` tracks short-term signal, `slow` tracks the drifting
/// baseline; their difference passes mid-frequency content while rejecting
/// both high-frequency noise and DC bias. Constant input drives the output
/// to zero as both poles converge on it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DualEmaBandpass {
    fast_alpha: f64,
    slow_alpha: f64,
    fast: f64,
    slow: f64,
}

impl DualEmaBandpass {
    /// `fast_alpha` and `slow_alpha` are the smoothing constants of the two
    /// poles; `fast_alpha` must be the larger for the difference to act as a
    /// band-pass.
    pub fn new(fast_alpha: f64, slow_alpha: f64) -> Self {
        Self {
            fast_alpha,
            slow_alpha,
            fast: 0.0,
            slow: 0.0,
        }
    }

    /// Advance both poles by one sample and return `fast - slow`.
    pub fn filter(&mut self, x: f64) -> f64 {
        self.fast += self.fast_alpha * (x - self.fast);
        self.slow += self.slow_alpha * (x - self.slow);
        self.fast - self.slow
    }

    /// Zero both accumulators. Used when a session restarts, not per call.
    pub fn reset(&mut self) {
        self.fast = 0.0;
        self.slow = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_input_stays_zero() {
        let mut filter = DualEmaBandpass::new(0.2, 0.02);
        for _ in 0..100 {
            assert_eq!(filter.filter(0.0), 0.0);
        }
    }

    #[test]
    fn test_constant_input_converges_to_zero() {
        let mut filter = DualEmaBandpass::new(0.2, 0.02);
        let mut out = 0.0;
        for _ in 0..2000 {
            out = filter.filter(5.0);
        }
        assert!(
            out.abs() < 1e-6,
            "constant input should be rejected, got {}",
            out
        );
    }

    #[test]
    fn test_step_response_is_initially_positive() {
        let mut filter = DualEmaBandpass::new(0.2, 0.02);
        // First sample of a positive step: fast pole leads the slow pole.
        let out = filter.filter(1.0);
        assert!((out - 0.18).abs() < 1e-12);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = DualEmaBandpass::new(0.2, 0.02);
        for _ in 0..50 {
            filter.filter(3.0);
        }
        filter.reset();
        assert_eq!(filter.filter(0.0), 0.0);
    }
}
