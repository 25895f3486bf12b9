// porygonbot-core/src/utils/random.rs

use std::collections::VecDeque;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Where the classifier gets its dice rolls from.
pub trait RandomSource {
    /// Uniform integer in `low..=high`.
    fn roll(&mut self, low: u32, high: u32) -> u32;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// Thread-local generator. Not `Send` across awaits, so build it inside a
/// synchronous block, use it, and drop it.
pub struct ThreadRandom(rand::rngs::ThreadRng);

impl ThreadRandom {
    pub fn new() -> Self {
        Self(rand::rng())
    }
}

impl Default for ThreadRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadRandom {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        self.0.random_range(low..=high)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.0.random_range(0..len)
    }
}

/// Reproducible generator.
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        Self(StdRng::from_os_rng())
    }
}

impl RandomSource for SeededRandom {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        self.0.random_range(low..=high)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.0.random_range(0..len)
    }
}

/// Hands out queued rolls first, then falls back to a seeded generator.
/// Index picks always come from the fallback.
pub struct ScriptedRandom {
    rolls: VecDeque<u32>,
    fallback: StdRng,
}

impl ScriptedRandom {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fallback: StdRng::seed_from_u64(7),
        }
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        match self.rolls.pop_front() {
            Some(v) => v,
            None => self.fallback.random_range(low..=high),
        }
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.fallback.random_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_is_reproducible() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        for _ in 0..100 {
            assert_eq!(a.roll(1, 8192), b.roll(1, 8192));
        }
    }

    #[test]
    fn rolls_stay_in_bounds() {
        let mut r = SeededRandom::from_os_rng();
        for _ in 0..1000 {
            let v = r.roll(1, 10);
            assert!((1..=10).contains(&v));
            assert!(r.pick_index(3) < 3);
        }
    }

    #[test]
    fn scripted_pops_then_falls_back() {
        let mut r = ScriptedRandom::new([1, 50]);
        assert_eq!(r.roll(1, 50), 1);
        assert_eq!(r.roll(1, 50), 50);
        assert_eq!(r.remaining(), 0);
        let v = r.roll(1, 6);
        assert!((1..=6).contains(&v));
    }
}
