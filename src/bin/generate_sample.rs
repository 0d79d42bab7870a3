use std::sync::Arc;

use arrow::array::Float64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Torque of a shaft under a cyclic load: a slow drift, a modulated
/// oscillation and a weaker harmonic, plus measurement noise.
fn torque_at(t_s: f64, rng: &mut SimpleRng) -> f64 {
    let tau = 2.0 * std::f64::consts::PI;
    let drift = 12.0 + 1.5 * (tau * t_s / 40.0).sin();
    let amplitude = 4.0 + 1.0 * (tau * t_s / 17.0).cos();
    let oscillation = amplitude * (tau * 0.8 * t_s).sin();
    let harmonic = 0.6 * (tau * 2.4 * t_s + 0.3).sin();
    drift + oscillation + harmonic + rng.gauss(0.0, 0.05)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut rng = SimpleRng::new(42);

    // 60 s at 100 Hz
    let sample_rate_hz = 100.0;
    let n_samples = 6000;
    let times_s: Vec<f64> = (0..n_samples).map(|i| i as f64 / sample_rate_hz).collect();
    let torque: Vec<f64> = times_s.iter().map(|&t| torque_at(t, &mut rng)).collect();

    // CSV: header row (skipped by the loader) then seconds, torque
    let csv_path = "sample_torque.csv";
    let mut writer = csv::Writer::from_path(csv_path).expect("Failed to create CSV file");
    writer
        .write_record(["time_s", "torque"])
        .expect("Failed to write CSV header");
    for (t, q) in times_s.iter().zip(&torque) {
        writer
            .write_record([format!("{t:.3}"), format!("{q:.6}")])
            .expect("Failed to write CSV row");
    }
    writer.flush().expect("Failed to flush CSV file");

    // Parquet: same two columns
    let schema = Arc::new(Schema::new(vec![
        Field::new("time_s", DataType::Float64, false),
        Field::new("torque", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(times_s.clone())),
            Arc::new(Float64Array::from(torque.clone())),
        ],
    )
    .expect("Failed to create RecordBatch");

    let parquet_path = "sample_torque.parquet";
    let file = std::fs::File::create(parquet_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    log::info!("Wrote {n_samples} samples ({sample_rate_hz} Hz) to {csv_path} and {parquet_path}");
}
