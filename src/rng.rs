use std::collections::HashMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Hands out one independent, reproducible stream per named system.
///
/// Streams are derived lazily from the master generator, so the order in
/// which systems first ask for their stream is part of the seed.
pub struct RngManager {
    master: ChaCha8Rng,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master: ChaCha8Rng::seed_from_u64(seed),
            streams: HashMap::new(),
        }
    }

    pub fn stream(&mut self, name: &str) -> SystemRng<'_> {
        let master = &mut self.master;
        let entry = self
            .streams
            .entry(name.to_string())
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(master.next_u64()));
        SystemRng { inner: entry }
    }
}

pub struct SystemRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for SystemRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// A tunable source of one scalar per call.
///
/// `Fixed` removes the randomness entirely, which is how tests and
/// calibration runs pin a coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Draw {
    Fixed { value: f64 },
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std_dev: f64 },
}

impl Draw {
    pub const fn fixed(value: f64) -> Self {
        Draw::Fixed { value }
    }

    pub const fn uniform(low: f64, high: f64) -> Self {
        Draw::Uniform { low, high }
    }

    pub const fn normal(mean: f64, std_dev: f64) -> Self {
        Draw::Normal { mean, std_dev }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Draw::Fixed { value } => value,
            Draw::Uniform { low, high } => {
                if high > low {
                    rng.gen_range(low..high)
                } else {
                    low
                }
            }
            // `Normal::new` accepts a negative spread, so reject it here.
            Draw::Normal { mean, std_dev } => {
                if !std_dev.is_finite() || std_dev < 0.0 {
                    return mean;
                }
                match Normal::new(mean, std_dev) {
                    Ok(normal) => normal.sample(rng),
                    Err(_) => mean,
                }
            }
        }
    }

    /// Sample and clamp into `[0, 1]`; NaN becomes 0.
    pub fn sample_unit<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        unit_clamp(self.sample(rng))
    }
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
pub fn unit_clamp(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RngManager::new(42);
        let mut b = RngManager::new(42);

        let va: f64 = a.stream("spread").gen();
        let vb: f64 = b.stream("spread").gen();
        assert_eq!(va, vb);
    }

    #[test]
    fn different_streams_diverge() {
        let mut rng = RngManager::new(42);
        let spread: f64 = rng.stream("spread").gen();
        let lifecycle: f64 = rng.stream("lifecycle").gen();
        assert_ne!(spread, lifecycle);
    }

    #[test]
    fn stream_state_persists_between_borrows() {
        let mut rng = RngManager::new(9);
        let first: u64 = rng.stream("spread").gen();
        let second: u64 = rng.stream("spread").gen();
        assert_ne!(first, second);
    }

    #[test]
    fn fixed_draw_ignores_rng() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(Draw::fixed(0.3).sample(&mut rng), 0.3);
    }

    #[test]
    fn uniform_draw_stays_in_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let draw = Draw::uniform(0.05, 0.15);
        for _ in 0..1_000 {
            let value = draw.sample(&mut rng);
            assert!((0.05..0.15).contains(&value));
        }
    }

    #[test]
    fn degenerate_draws_fall_back() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(Draw::uniform(0.4, 0.4).sample(&mut rng), 0.4);
        assert_eq!(Draw::normal(0.7, -1.0).sample(&mut rng), 0.7);
    }

    #[test]
    fn negative_or_non_finite_spread_is_always_the_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            assert_eq!(Draw::normal(0.7, -0.3).sample(&mut rng), 0.7);
            assert_eq!(Draw::normal(0.2, f64::NAN).sample(&mut rng), 0.2);
            assert_eq!(Draw::normal(0.4, f64::INFINITY).sample(&mut rng), 0.4);
        }
        assert_eq!(Draw::normal(0.5, 0.0).sample(&mut rng), 0.5);
    }

    #[test]
    fn unit_clamp_handles_nan() {
        assert_eq!(unit_clamp(f64::NAN), 0.0);
        assert_eq!(unit_clamp(1.7), 1.0);
        assert_eq!(unit_clamp(-0.2), 0.0);
    }

    #[test]
    fn draw_reads_from_yaml() {
        let draw: Draw = serde_yaml::from_str("kind: normal\nmean: 0.5\nstd_dev: 0.2\n").unwrap();
        assert_eq!(draw, Draw::normal(0.5, 0.2));
    }
}
