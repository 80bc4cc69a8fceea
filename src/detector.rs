//! Wrist Fatigue Detector
//!
//! The central state machine of the crate. One instance owns everything for
//! one connected-sensor session: bias calibration, the tremor band-pass
//! filter, the segment buffer, the adaptive RMS statistics, and the CUSUM
//! change detector. Single-threaded: each sample is processed to completion
//! before the next is accepted, so there is nothing to lock.
//!
//! Lifecycle: `Calibrating` → `Active`, once per instance. Inside `Active`
//! the detection flag can go `false` → `true` and then never reverts.

use crate::algo::{DualEmaBandpass, OneSidedCusum};
use crate::report::{FatigueReport, Observation};
use serde::{Deserialize, Serialize};

/// Detector tuning. Defaults match the deployed wrist-sensor profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Samples per RMS segment. Segments are disjoint, not sliding.
    pub window: usize,
    /// Smoothing constant for the per-segment RMS mean estimate.
    pub mean_alpha: f64,
    /// Smoothing constant for the per-segment RMS variance estimate.
    pub var_beta: f64,
    /// CUSUM slack: z-score deviation absorbed before evidence accumulates.
    pub slack: f64,
    /// CUSUM decision interval; crossing it latches detection.
    pub threshold: f64,
    /// Bias-corrected components below this magnitude are zeroed.
    pub deadband: f64,
    /// Samples accumulated before the per-axis bias is fixed.
    pub calibration_samples: u32,
    /// Fast pole of the band-pass filter.
    pub fast_alpha: f64,
    /// Slow pole of the band-pass filter.
    pub slow_alpha: f64,
    /// Standard deviations below this are treated as degenerate.
    pub min_std: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window: 200,
            mean_alpha: 0.02,
            var_beta: 0.02,
            slack: 0.3,
            threshold: 7.0,
            deadband: 0.5,
            calibration_samples: 600,
            fast_alpha: 0.2,
            slow_alpha: 0.02,
            min_std: 1e-6,
        }
    }
}

/// Session phase. The transition to `Active` is one-way; accumulating bias
/// sums while active is unrepresentable.
#[derive(Debug, Clone)]
enum Phase {
    Calibrating { sum: [f64; 3], count: u32 },
    Active { bias: [f64; 3], detected: bool },
}

/// Fatigue detector for one sensor stream.
///
/// Feed decoded angular-rate samples in arrival order via [`update`];
/// every call returns one [`Observation`]. Discard the instance at session
/// teardown; no state survives it.
///
/// [`update`]: FatigueDetector::update
#[derive(Debug, Clone)]
pub struct FatigueDetector {
    config: DetectorConfig,
    phase: Phase,
    filter: DualEmaBandpass,
    cusum: OneSidedCusum,
    buffer: Vec<f64>,
    mean_est: f64,
    var_est: f64,
}

impl FatigueDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            filter: DualEmaBandpass::new(config.fast_alpha, config.slow_alpha),
            cusum: OneSidedCusum::new(config.slack),
            buffer: Vec::with_capacity(config.window),
            mean_est: 0.0,
            // Seeded to 1 so the first windows standardize against a sane
            // spread instead of dividing by zero.
            var_est: 1.0,
            phase: Phase::Calibrating {
                sum: [0.0; 3],
                count: 0,
            },
            config,
        }
    }

    /// Consume one angular-rate sample (degrees/second).
    pub fn update(&mut self, gx: f64, gy: f64, gz: f64) -> Observation {
        let DetectorConfig {
            window,
            mean_alpha,
            var_beta,
            threshold,
            deadband,
            calibration_samples,
            min_std,
            ..
        } = self.config;

        match &mut self.phase {
            Phase::Calibrating { sum, count } => {
                sum[0] += gx;
                sum[1] += gy;
                sum[2] += gz;
                *count += 1;

                if *count >= calibration_samples {
                    let n = calibration_samples as f64;
                    let bias = [sum[0] / n, sum[1] / n, sum[2] / n];
                    self.phase = Phase::Active {
                        bias,
                        detected: false,
                    };
                    Observation::Calibrating { remaining: 0 }
                } else {
                    Observation::Calibrating {
                        remaining: calibration_samples - *count,
                    }
                }
            }
            Phase::Active { bias, detected } => {
                let corrected = [gx - bias[0], gy - bias[1], gz - bias[2]];
                let gated = corrected.map(|v| if v.abs() < deadband { 0.0 } else { v });
                let magnitude =
                    (gated[0] * gated[0] + gated[1] * gated[1] + gated[2] * gated[2]).sqrt();

                let tremor = self.filter.filter(magnitude);
                self.buffer.push(tremor);
                if self.buffer.len() < window {
                    return Observation::Pending;
                }

                // Segment complete: drain it in full and start the next one
                // from empty.
                let rms = (self.buffer.iter().map(|x| x * x).sum::<f64>()
                    / self.buffer.len() as f64)
                    .sqrt();
                self.buffer.clear();

                self.mean_est = (1.0 - mean_alpha) * self.mean_est + mean_alpha * rms;
                // Deviation against the already-updated mean. Not the
                // textbook recursion; kept to match the deployed behavior.
                let deviation = rms - self.mean_est;
                self.var_est = (1.0 - var_beta) * self.var_est + var_beta * deviation * deviation;

                let std_est = self.var_est.sqrt();
                if std_est < min_std {
                    return Observation::Pending;
                }

                let zscore = (rms - self.mean_est) / std_est;
                let cusum = self.cusum.update(zscore);
                let fatigue_percent = (cusum / threshold * 100.0).min(100.0);

                if cusum > threshold {
                    *detected = true;
                }

                Observation::Report(FatigueReport {
                    rms,
                    fatigue_percent,
                    detected: *detected,
                    cusum,
                    zscore,
                })
            }
        }
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.phase, Phase::Calibrating { .. })
    }

    /// Sticky detection flag; false while calibrating.
    pub fn detected(&self) -> bool {
        matches!(self.phase, Phase::Active { detected: true, .. })
    }

    /// Per-axis bias estimate, available once calibration has completed.
    pub fn bias(&self) -> Option<[f64; 3]> {
        match self.phase {
            Phase::Active { bias, .. } => Some(bias),
            Phase::Calibrating { .. } => None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

impl Default for FatigueDetector {
    fn default() -> Self {
        Self::new()
    }
}
