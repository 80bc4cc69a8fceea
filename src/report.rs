//! Per-Sample Detector Output
//!
//! Every sample fed to the detector yields exactly one [`Observation`].
//! Consumers render the three cases distinctly: a calibration progress
//! marker, a quiet "no new window" marker, and a completed-window report.

use serde::{Deserialize, Serialize};

/// Statistics from one completed segment window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueReport {
    /// Root-mean-square of the tremor-band signal over the segment.
    pub rms: f64,
    /// Bounded progress toward the detection threshold, 0–100.
    pub fatigue_percent: f64,
    /// Sticky detection flag: once true, true for the session's lifetime.
    pub detected: bool,
    /// Raw one-sided CUSUM score.
    pub cusum: f64,
    /// Standardized deviation of this segment's RMS from the running mean.
    pub zscore: f64,
}

/// Outcome of feeding one sample to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// Bias calibration still running; `remaining` samples until active.
    Calibrating { remaining: u32 },
    /// No new result this sample: the segment window is still filling, or
    /// the window's variance estimate was too degenerate to standardize.
    Pending,
    /// A segment window completed and produced fresh statistics.
    Report(FatigueReport),
}

impl Observation {
    /// The completed-window report, if this sample produced one.
    pub fn report(&self) -> Option<&FatigueReport> {
        match self {
            Self::Report(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self, Self::Calibrating { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_accessors() {
        let report = FatigueReport {
            rms: 1.5,
            fatigue_percent: 40.0,
            detected: false,
            cusum: 2.8,
            zscore: 1.1,
        };

        assert!(Observation::Pending.is_pending());
        assert!(Observation::Calibrating { remaining: 12 }.is_calibrating());
        assert_eq!(Observation::Report(report).report(), Some(&report));
        assert_eq!(Observation::Pending.report(), None);
    }

    #[test]
    fn test_serialized_cases_are_tagged() {
        let calibrating = serde_json::to_string(&Observation::Calibrating { remaining: 3 }).unwrap();
        assert!(calibrating.contains("\"kind\":\"calibrating\""));

        let pending = serde_json::to_string(&Observation::Pending).unwrap();
        assert!(pending.contains("\"kind\":\"pending\""));

        let report = serde_json::to_string(&Observation::Report(FatigueReport {
            rms: 0.0,
            fatigue_percent: 0.0,
            detected: true,
            cusum: 8.0,
            zscore: 0.0,
        }))
        .unwrap();
        assert!(report.contains("\"kind\":\"report\""));
        assert!(report.contains("\"detected\":true"));
    }
}
