//! Synthetic sensor replay.
//!
//! Drives a full session without hardware: generates wire frames from a
//! simulated wrist signal (a still calibration phase, a steady-motion
//! baseline, then a sustained tremor-band burst), streams them through the
//! session driver in irregular chunks with occasional line noise, and prints
//! the session summary as one JSON line.

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tokio::sync::mpsc;
use tracing::info;
use tremor_core::frame::ImuFrame;
use tremor_core::report::Observation;
use tremor_core::{DetectorConfig, stream};

const SAMPLE_HZ: f64 = 50.0;
const TREMOR_HZ: f64 = 9.0;

const STILL_SAMPLES: usize = 600;
const BASELINE_SAMPLES: usize = 2000;
const TREMOR_SAMPLES: usize = 6000;

/// Fixed sensor bias the calibration phase should recover.
const BIAS: [f64; 3] = [0.8, -0.4, 0.2];

fn gyro_at(i: usize, rng: &mut StdRng) -> [f64; 3] {
    let still = Normal::new(0.0, 0.05).unwrap();
    let motion = Normal::new(0.0, 2.0).unwrap();

    let mut gyro = BIAS;
    if i < STILL_SAMPLES {
        for axis in &mut gyro {
            *axis += still.sample(rng);
        }
        return gyro;
    }

    for axis in &mut gyro {
        *axis += motion.sample(rng);
    }
    if i >= STILL_SAMPLES + BASELINE_SAMPLES {
        // Sustained tremor-band oscillation on top of the baseline motion.
        let t = i as f64 / SAMPLE_HZ;
        let phase = 2.0 * std::f64::consts::PI * TREMOR_HZ * t;
        gyro[0] += 25.0 * phase.sin();
        gyro[1] += 18.0 * (phase + 1.0).sin();
        gyro[2] += 10.0 * (phase + 2.0).sin();
    }
    gyro
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let (byte_tx, byte_rx) = mpsc::channel::<Bytes>(64);
    let (obs_tx, mut obs_rx) = mpsc::channel::<Observation>(256);

    let driver = tokio::spawn(stream::drive(DetectorConfig::default(), byte_rx, obs_tx));

    let feeder = tokio::spawn(async move {
        let mut rng = StdRng::seed_from_u64(7);
        let total = STILL_SAMPLES + BASELINE_SAMPLES + TREMOR_SAMPLES;

        let mut wire = Vec::with_capacity(total * 20);
        for i in 0..total {
            wire.extend_from_slice(&ImuFrame::from_gyro(gyro_at(i, &mut rng)).encode());
            // Occasional line noise between frames; the assembler resyncs.
            if i % 500 == 499 {
                wire.extend_from_slice(&[0x13, 0x37]);
            }
        }

        // Deliver in irregular chunk sizes, as a real transport would.
        let mut offset = 0;
        while offset < wire.len() {
            let end = (offset + rng.random_range(1..=45)).min(wire.len());
            if byte_tx
                .send(Bytes::copy_from_slice(&wire[offset..end]))
                .await
                .is_err()
            {
                return;
            }
            offset = end;
        }
    });

    let mut windows = 0u64;
    while let Some(observation) = obs_rx.recv().await {
        match observation {
            Observation::Calibrating { remaining } => {
                if remaining % 200 == 0 {
                    info!(remaining, "calibrating, keep the sensor still");
                }
            }
            Observation::Report(report) => {
                windows += 1;
                info!(
                    window = windows,
                    rms = format!("{:.4}", report.rms),
                    zscore = format!("{:.2}", report.zscore),
                    cusum = format!("{:.2}", report.cusum),
                    fatigue = format!("{:.1}%", report.fatigue_percent),
                    detected = report.detected,
                    "window complete"
                );
            }
            Observation::Pending => {}
        }
    }

    feeder.await.expect("feeder task panicked");
    let summary = driver.await.expect("driver task panicked");
    println!("{}", serde_json::to_string(&summary).expect("summary serializes"));
}
