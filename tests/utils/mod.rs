// Integration test utilities
//
// Synthetic traffic datasets: normal rows cluster tightly in three regimes,
// jam rows are slow, dense and brake-heavy.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

pub const HEADER: &str =
    "time_step,road_segment_id,local_car_density,average_speed_kmph,brake_events,phantom_jam_flag";

/// CSV text with `n` rows; the first `jams` rows are labeled as jams
pub fn traffic_csv(n: usize, jams: usize, seed: u64) -> String {
    const REGIMES: [(f64, f64, f64); 3] = [(12.0, 90.0, 1.0), (20.0, 70.0, 2.0), (28.0, 55.0, 3.0)];

    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::from(HEADER);
    out.push('\n');

    for i in 0..n {
        let (density, speed, brakes, flag) = if i < jams {
            (
                rng.gen_range(40.0..60.0),
                rng.gen_range(5.0..25.0),
                rng.gen_range(8.0..15.0),
                1,
            )
        } else {
            let (d, s, b) = REGIMES[i % REGIMES.len()];
            (
                d + rng.gen_range(-1.0..1.0),
                s + rng.gen_range(-3.0..3.0),
                b + rng.gen_range(-0.2..0.2),
                0,
            )
        };
        out.push_str(&format!(
            "{},{},{:.3},{:.3},{:.3},{}\n",
            i / 5,
            i % 5,
            density,
            speed,
            brakes,
            flag
        ));
    }
    out
}

/// Write a synthetic dataset into `dir` and return its path
pub fn write_dataset(dir: &Path, name: &str, n: usize, jams: usize, seed: u64) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, traffic_csv(n, jams, seed)).expect("Failed to write dataset");
    path
}
