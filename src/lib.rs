//! Wrist-Tremor Fatigue Detection Core
//!
//! Turns the byte stream of a wrist-worn inertial sensor into per-sample
//! fatigue observations. The pipeline, in order: 20-byte frame reassembly
//! with header resynchronization, fixed-offset frame decode to physical
//! units, per-axis bias calibration with a noise deadband, a dual-EMA
//! band-pass over the angular-rate magnitude, disjoint-segment RMS energy
//! estimation, and a self-calibrating z-score driving a one-sided CUSUM
//! whose threshold crossing latches a sticky detection flag.
//!
//! The core is single-threaded and allocation-light: one
//! [`detector::FatigueDetector`] (or one [`stream::SensorSession`] wrapping
//! it) per connected sensor, fed in arrival order, discarded at disconnect.
//! Transport (BLE central role) and presentation are external collaborators;
//! the crate's boundary is bytes in, observations out.
//!
//! # Example
//!
//! ```
//! use tremor_core::{FatigueDetector, Observation};
//!
//! let mut detector = FatigueDetector::new();
//! match detector.update(1.2, -0.4, 0.1) {
//!     Observation::Calibrating { remaining } => assert!(remaining > 0),
//!     _ => unreachable!("the first samples always calibrate"),
//! }
//! ```

pub mod algo;
pub mod detector;
pub mod frame;
pub mod report;
pub mod stream;

// Re-export commonly used types
pub use detector::{DetectorConfig, FatigueDetector};
pub use frame::{Frame, FrameError, ImuFrame, RegisterFrame};
pub use report::{FatigueReport, Observation};
pub use stream::{FrameAssembler, SensorSession, SessionSummary};
