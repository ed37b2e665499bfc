//! Deterministic RNG helpers.
//!
//! Small and dependency-free, so a seeded bot makes the same choices on every
//! run. It is **not** cryptographic.

use serde::{Deserialize, Serialize};

pub trait DeterministicRng {
    fn next_u64(&mut self) -> u64;

    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    /// Uniform value in `[0, 1)` with 53 bits of precision.
    fn next_f64_unit(&mut self) -> f64 {
        let x = self.next_u64() >> 11;
        (x as f64) / ((1u64 << 53) as f64)
    }

    /// Uniform index in `[0, n)`. Returns 0 when `n` is 0.
    fn next_index(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((self.next_f64_unit() * n as f64) as usize).min(n - 1)
    }

    fn next_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// SplitMix64: good seeding RNG and small deterministic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn step(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl DeterministicRng for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.step()
    }
}

pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

/// Derive an independent stream seed, e.g. one per action.
pub fn derive_seed(global_seed: u64, stream: u64) -> u64 {
    mix64(global_seed ^ mix64(stream.wrapping_add(0x9E3779B97F4A7C15)))
}

/// Stable stream id for a string label.
pub fn stream_id(label: &str) -> u64 {
    label
        .bytes()
        .fold(0xCBF29CE484222325, |acc, b| mix64(acc ^ u64::from(b)))
}

/// How random values are spread over a range.
///
/// `Square` and `Cube` skew towards the low end of the range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spread {
    #[default]
    Linear,
    Square,
    Cube,
}

impl Spread {
    pub fn apply(self, unit: f64) -> f64 {
        match self {
            Spread::Linear => unit,
            Spread::Square => unit * unit,
            Spread::Cube => unit * unit * unit,
        }
    }

    /// Random integer in `[from, to)` (or `from` when the range is empty).
    pub fn sample(self, rng: &mut impl DeterministicRng, from: u64, to: u64) -> u64 {
        if to <= from {
            return from;
        }
        let r = self.apply(rng.next_f64_unit());
        from + ((r * (to - from) as f64) as u64).min(to - from - 1)
    }
}
