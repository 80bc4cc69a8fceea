//! Binary Wire Frames for the Wrist Sensor
//!
//! The sensor streams fixed-length 20-byte frames. Every frame opens with a
//! header byte and a flag byte; all multi-byte fields are signed 16-bit
//! little-endian, scaled to physical units by a per-field full-scale divisor.
//!
//! # Frame Layout
//!
//! | Bytes | Streaming frame (flag 0x61) | Register reply (flag 0x71) |
//! |-------|-----------------------------|----------------------------|
//! | 0     | header 0x55                 | header 0x55                |
//! | 1     | flag                        | flag                       |
//! | 2..8  | acceleration x/y/z (±16 g)  | register id, padding       |
//! | 8..14 | angular rate x/y/z (±2000 °/s) | register payload        |
//! | 14..20| orientation x/y/z (±180°)   | register payload / unused  |
//!
//! Register `0x3A` carries the magnetic field (1/120 µT per LSB) and `0x51`
//! the orientation quaternion (1/32768 per LSB), both starting at byte 4.
//!
//! Decoding is pure and stateless; anything shorter than 20 bytes or carrying
//! an unknown header/flag is rejected and must be dropped by the caller, not
//! passed downstream.

use serde::{Deserialize, Serialize};

/// Fixed frame length on the wire.
pub const FRAME_LEN: usize = 20;

/// Every frame starts with this byte.
pub const HEADER_BYTE: u8 = 0x55;

/// Flag for the default streaming IMU frame.
pub const FLAG_IMU: u8 = 0x61;

/// Flag for a register read reply.
pub const FLAG_REGISTER: u8 = 0x71;

/// Register id for the magnetic field reading.
pub const REG_MAGNETOMETER: u8 = 0x3A;

/// Register id for the orientation quaternion.
pub const REG_QUATERNION: u8 = 0x51;

/// Accelerometer full scale in g.
pub const ACCEL_FULL_SCALE: f64 = 16.0;

/// Gyroscope full scale in degrees/second.
pub const GYRO_FULL_SCALE: f64 = 2000.0;

/// Orientation angle full scale in degrees.
pub const ANGLE_FULL_SCALE: f64 = 180.0;

/// Magnetometer LSBs per microtesla.
pub const MAG_LSB_PER_UT: f64 = 120.0;

const I16_RANGE: f64 = 32768.0;

/// One decoded 20-byte frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    /// Streaming inertial sample (flag 0x61).
    Imu(ImuFrame),
    /// Register read reply (flag 0x71).
    Register(RegisterFrame),
}

/// Inertial sample in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuFrame {
    /// Acceleration x/y/z in g.
    pub accel: [f64; 3],
    /// Angular rate x/y/z in degrees/second.
    pub gyro: [f64; 3],
    /// Orientation angles x/y/z in degrees.
    pub angle: [f64; 3],
}

/// Register read reply payloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RegisterFrame {
    /// Magnetic field x/y/z in microtesla.
    Magnetometer([f64; 3]),
    /// Orientation quaternion w/x/y/z, unit scale.
    Quaternion([f64; 4]),
}

/// Frame rejection reasons. The caller drops the frame and resumes byte
/// reassembly; retries belong to the transport, not this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    Truncated { len: usize },
    BadHeader(u8),
    UnknownFlag(u8),
    UnknownRegister(u8),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated { len } => {
                write!(f, "truncated frame: {} bytes (need {})", len, FRAME_LEN)
            }
            Self::BadHeader(b) => write!(f, "bad header byte: 0x{:02X}", b),
            Self::UnknownFlag(b) => write!(f, "unknown frame flag: 0x{:02X}", b),
            Self::UnknownRegister(r) => write!(f, "unknown register id: 0x{:02X}", r),
        }
    }
}

impl std::error::Error for FrameError {}

/// Read the signed 16-bit little-endian field at `offset`.
#[inline]
fn field(buf: &[u8], offset: usize) -> f64 {
    i16::from_le_bytes([buf[offset], buf[offset + 1]]) as f64
}

/// Decode one frame. Pure and deterministic: identical bytes always produce
/// the identical result.
pub fn decode(buf: &[u8]) -> Result<Frame, FrameError> {
    if buf.len() < FRAME_LEN {
        return Err(FrameError::Truncated { len: buf.len() });
    }
    if buf[0] != HEADER_BYTE {
        return Err(FrameError::BadHeader(buf[0]));
    }

    match buf[1] {
        FLAG_IMU => {
            let scale = |offset: usize, full_scale: f64| field(buf, offset) / I16_RANGE * full_scale;
            Ok(Frame::Imu(ImuFrame {
                accel: [
                    scale(2, ACCEL_FULL_SCALE),
                    scale(4, ACCEL_FULL_SCALE),
                    scale(6, ACCEL_FULL_SCALE),
                ],
                gyro: [
                    scale(8, GYRO_FULL_SCALE),
                    scale(10, GYRO_FULL_SCALE),
                    scale(12, GYRO_FULL_SCALE),
                ],
                angle: [
                    scale(14, ANGLE_FULL_SCALE),
                    scale(16, ANGLE_FULL_SCALE),
                    scale(18, ANGLE_FULL_SCALE),
                ],
            }))
        }
        FLAG_REGISTER => match buf[2] {
            REG_MAGNETOMETER => Ok(Frame::Register(RegisterFrame::Magnetometer([
                field(buf, 4) / MAG_LSB_PER_UT,
                field(buf, 6) / MAG_LSB_PER_UT,
                field(buf, 8) / MAG_LSB_PER_UT,
            ]))),
            REG_QUATERNION => Ok(Frame::Register(RegisterFrame::Quaternion([
                field(buf, 4) / I16_RANGE,
                field(buf, 6) / I16_RANGE,
                field(buf, 8) / I16_RANGE,
                field(buf, 10) / I16_RANGE,
            ]))),
            other => Err(FrameError::UnknownRegister(other)),
        },
        other => Err(FrameError::UnknownFlag(other)),
    }
}

impl ImuFrame {
    /// Encode into wire bytes, quantizing each field to its i16 raw value.
    /// Used by the replay generator and tests; the sensor itself is the
    /// producer in production.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0] = HEADER_BYTE;
        buf[1] = FLAG_IMU;

        let mut write = |offset: usize, value: f64, full_scale: f64| {
            let raw = (value / full_scale * I16_RANGE)
                .round()
                .clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            buf[offset..offset + 2].copy_from_slice(&raw.to_le_bytes());
        };

        write(2, self.accel[0], ACCEL_FULL_SCALE);
        write(4, self.accel[1], ACCEL_FULL_SCALE);
        write(6, self.accel[2], ACCEL_FULL_SCALE);
        write(8, self.gyro[0], GYRO_FULL_SCALE);
        write(10, self.gyro[1], GYRO_FULL_SCALE);
        write(12, self.gyro[2], GYRO_FULL_SCALE);
        write(14, self.angle[0], ANGLE_FULL_SCALE);
        write(16, self.angle[1], ANGLE_FULL_SCALE);
        write(18, self.angle[2], ANGLE_FULL_SCALE);
        buf
    }

    /// Frame carrying only an angular rate, other fields zero.
    pub fn from_gyro(gyro: [f64; 3]) -> Self {
        Self {
            accel: [0.0; 3],
            gyro,
            angle: [0.0; 3],
        }
    }
}
