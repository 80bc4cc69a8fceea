//! Stream Driver
//!
//! Bridges the byte-delivery collaborator (the BLE transport) to the
//! detector. Bytes arrive in arbitrary chunk sizes; this layer reassembles
//! 20-byte frame boundaries, resynchronizes on the header and flag bytes
//! when the stream is disturbed, decodes, and feeds the detector one sample
//! at a time in arrival order. A partial frame left at stream end is
//! discarded, never decoded.
//!
//! This is the only layer that logs and the only layer that may suspend
//! (awaiting the next chunk); decode-and-update itself is bounded,
//! synchronous work.

use crate::detector::{DetectorConfig, FatigueDetector};
use crate::frame::{self, FRAME_LEN, Frame, RegisterFrame};
use crate::report::Observation;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Accumulates bytes into fixed 20-byte frames.
///
/// Resync rule: a pending frame whose first byte is not the header, or whose
/// second byte is not a known flag, is discarded immediately so a single
/// corrupt byte cannot shift every following frame boundary.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    pending: Vec<u8>,
    discarded: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(FRAME_LEN),
            discarded: 0,
        }
    }

    /// Feed one byte; returns a complete raw frame when a boundary is hit.
    pub fn push(&mut self, byte: u8) -> Option<[u8; FRAME_LEN]> {
        self.pending.push(byte);

        match self.pending.len() {
            1 if self.pending[0] != frame::HEADER_BYTE => {
                self.discarded += 1;
                self.pending.clear();
                None
            }
            2 if !matches!(self.pending[1], frame::FLAG_IMU | frame::FLAG_REGISTER) => {
                self.discarded += 2;
                self.pending.clear();
                None
            }
            FRAME_LEN => {
                let mut raw = [0u8; FRAME_LEN];
                raw.copy_from_slice(&self.pending);
                self.pending.clear();
                Some(raw)
            }
            _ => None,
        }
    }

    /// Bytes buffered toward the next frame boundary.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Bytes dropped during resynchronization.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// End-of-session accounting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Well-formed frames decoded (streaming and register frames).
    pub frames: u64,
    /// Complete frames rejected by the decoder.
    pub malformed_frames: u64,
    /// Bytes dropped while resynchronizing frame boundaries.
    pub discarded_bytes: u64,
    pub detected: bool,
}

/// One connected-sensor session: a frame assembler paired with the detector
/// it feeds. Created at connect, discarded at disconnect; nothing persists
/// across sessions and nothing is shared between concurrent sessions.
pub struct SensorSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    assembler: FrameAssembler,
    detector: FatigueDetector,
    magnetometer: Option<[f64; 3]>,
    quaternion: Option<[f64; 4]>,
    frames: u64,
    malformed: u64,
}

impl SensorSession {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            assembler: FrameAssembler::new(),
            detector: FatigueDetector::with_config(config),
            magnetometer: None,
            quaternion: None,
            frames: 0,
            malformed: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Feed a chunk of transport bytes. Returns one observation per decoded
    /// streaming sample, in arrival order. Register frames update the
    /// side-channel values and produce no observation; malformed frames are
    /// dropped here and never reach the detector.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<Observation> {
        let mut observations = Vec::new();

        for &byte in chunk {
            let Some(raw) = self.assembler.push(byte) else {
                continue;
            };

            match frame::decode(&raw) {
                Ok(Frame::Imu(imu)) => {
                    self.frames += 1;
                    let [gx, gy, gz] = imu.gyro;

                    let was_calibrating = self.detector.is_calibrating();
                    let was_detected = self.detector.detected();
                    let observation = self.detector.update(gx, gy, gz);

                    if was_calibrating && !self.detector.is_calibrating() {
                        info!(session = %self.id, bias = ?self.detector.bias(), "bias calibration complete");
                    }
                    if !was_detected && self.detector.detected() {
                        warn!(session = %self.id, "fatigue onset detected");
                    }

                    observations.push(observation);
                }
                Ok(Frame::Register(RegisterFrame::Magnetometer(m))) => {
                    self.frames += 1;
                    self.magnetometer = Some(m);
                }
                Ok(Frame::Register(RegisterFrame::Quaternion(q))) => {
                    self.frames += 1;
                    self.quaternion = Some(q);
                }
                Err(error) => {
                    self.malformed += 1;
                    warn!(session = %self.id, %error, "dropping malformed frame");
                }
            }
        }

        observations
    }

    /// Latest magnetometer reading from a register frame, if any arrived.
    pub fn magnetometer(&self) -> Option<[f64; 3]> {
        self.magnetometer
    }

    /// Latest orientation quaternion from a register frame, if any arrived.
    pub fn quaternion(&self) -> Option<[f64; 4]> {
        self.quaternion
    }

    pub fn detector(&self) -> &FatigueDetector {
        &self.detector
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            started_at: self.started_at,
            frames: self.frames,
            malformed_frames: self.malformed,
            discarded_bytes: self.assembler.discarded(),
            detected: self.detector.detected(),
        }
    }
}

impl Default for SensorSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one session over channels: transport chunks in, observations out.
///
/// `Pending` is the expected quiet state between completed windows and is not
/// forwarded; consumers receive calibration progress and completed-window
/// reports. Returns the session summary once the byte channel closes (sensor
/// disconnect) or the consumer goes away.
pub async fn drive(
    config: DetectorConfig,
    mut chunks: mpsc::Receiver<Bytes>,
    observations: mpsc::Sender<Observation>,
) -> SessionSummary {
    let mut session = SensorSession::with_config(config);
    info!(session = %session.id(), "sensor session opened");

    'recv: while let Some(chunk) = chunks.recv().await {
        for observation in session.push_bytes(&chunk) {
            if observation.is_pending() {
                continue;
            }
            if observations.send(observation).await.is_err() {
                debug!(session = %session.id(), "observation consumer dropped, closing session");
                break 'recv;
            }
        }
    }

    let summary = session.summary();
    info!(
        session = %summary.id,
        frames = summary.frames,
        malformed = summary.malformed_frames,
        discarded = summary.discarded_bytes,
        detected = summary.detected,
        "sensor session closed"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ImuFrame;

    fn gyro_frame(gyro: [f64; 3]) -> [u8; FRAME_LEN] {
        ImuFrame::from_gyro(gyro).encode()
    }

    #[test]
    fn test_assembler_yields_aligned_frames() {
        let mut assembler = FrameAssembler::new();
        let frame_bytes = gyro_frame([10.0, 0.0, 0.0]);

        for (i, &byte) in frame_bytes.iter().enumerate() {
            let out = assembler.push(byte);
            if i < FRAME_LEN - 1 {
                assert!(out.is_none());
            } else {
                assert_eq!(out, Some(frame_bytes));
            }
        }
        assert_eq!(assembler.pending_len(), 0);
        assert_eq!(assembler.discarded(), 0);
    }

    #[test]
    fn test_assembler_resyncs_on_garbage() {
        let mut assembler = FrameAssembler::new();

        // Leading garbage is dropped byte by byte.
        for byte in [0x00, 0x13, 0xFF] {
            assert!(assembler.push(byte).is_none());
        }
        assert_eq!(assembler.discarded(), 3);

        // A header byte followed by an unknown flag drops both.
        assert!(assembler.push(frame::HEADER_BYTE).is_none());
        assert!(assembler.push(0x42).is_none());
        assert_eq!(assembler.discarded(), 5);

        // The next well-formed frame comes through intact.
        let frame_bytes = gyro_frame([-5.0, 2.0, 0.0]);
        let mut yielded = None;
        for &byte in &frame_bytes {
            yielded = assembler.push(byte);
        }
        assert_eq!(yielded, Some(frame_bytes));
    }

    #[test]
    fn test_session_survives_chunk_fragmentation() {
        let mut session = SensorSession::new();
        let frame_bytes = gyro_frame([1.0, 1.0, 1.0]);

        // One frame delivered a byte at a time yields exactly one observation.
        let mut total = 0;
        for &byte in &frame_bytes {
            total += session.push_bytes(&[byte]).len();
        }
        assert_eq!(total, 1);

        // Two frames split at an awkward boundary still yield two.
        let mut doubled = Vec::new();
        doubled.extend_from_slice(&frame_bytes);
        doubled.extend_from_slice(&frame_bytes);
        let observations = session.push_bytes(&doubled[..27]);
        assert_eq!(observations.len(), 1);
        let observations = session.push_bytes(&doubled[27..]);
        assert_eq!(observations.len(), 1);
    }

    #[test]
    fn test_register_frames_update_side_channel() {
        let mut session = SensorSession::new();
        assert_eq!(session.magnetometer(), None);

        let mut raw = [0u8; FRAME_LEN];
        raw[0] = frame::HEADER_BYTE;
        raw[1] = frame::FLAG_REGISTER;
        raw[2] = frame::REG_MAGNETOMETER;
        raw[4..6].copy_from_slice(&120i16.to_le_bytes());

        let observations = session.push_bytes(&raw);
        assert!(observations.is_empty(), "register frames produce no observation");
        let m = session.magnetometer().unwrap();
        assert!((m[0] - 1.0).abs() < 1e-9);
        assert_eq!(session.summary().frames, 1);
    }

    #[test]
    fn test_partial_trailing_frame_is_never_decoded() {
        let mut session = SensorSession::new();
        let frame_bytes = gyro_frame([0.0, 0.0, 0.0]);

        let observations = session.push_bytes(&frame_bytes[..12]);
        assert!(observations.is_empty());
        assert_eq!(session.summary().frames, 0);
    }

    #[tokio::test]
    async fn test_drive_forwards_reports_not_pending() {
        let config = DetectorConfig {
            window: 5,
            calibration_samples: 2,
            ..Default::default()
        };
        let (byte_tx, byte_rx) = mpsc::channel(16);
        let (obs_tx, mut obs_rx) = mpsc::channel(64);
        let driver = tokio::spawn(drive(config, byte_rx, obs_tx));

        // 2 calibration samples + 10 active samples = 2 completed windows.
        for _ in 0..12 {
            let chunk = Bytes::copy_from_slice(&gyro_frame([2.0, 2.0, 2.0]));
            byte_tx.send(chunk).await.unwrap();
        }
        drop(byte_tx);

        let mut calibrating = 0;
        let mut reports = 0;
        while let Some(observation) = obs_rx.recv().await {
            match observation {
                Observation::Calibrating { .. } => calibrating += 1,
                Observation::Report(_) => reports += 1,
                Observation::Pending => panic!("pending must not be forwarded"),
            }
        }

        assert_eq!(calibrating, 2);
        assert_eq!(reports, 2);

        let summary = driver.await.unwrap();
        assert_eq!(summary.frames, 12);
        assert_eq!(summary.discarded_bytes, 0);
    }
}
