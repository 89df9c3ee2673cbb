//! Injectable randomness.
//!
//! The wiring routines break ties by uniform random choice over a candidate
//! set. Production uses the thread-local generator; tests inject a seeded
//! generator and assert set membership rather than a specific pick.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of randomness for candidate selection and salts.
pub trait RandomSource: Send + Sync {
    /// Returns a uniform index in `0..upper`. `upper` must be non-zero.
    fn pick(&self, upper: usize) -> usize;

    /// Fills the buffer with random bytes (used for password salts).
    fn fill(&self, buf: &mut [u8]);

    /// Picks a uniform random element from the slice, or `None` when empty.
    fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.pick(items.len())])
        }
    }
}

/// Uniform random element of a slice through a trait object.
pub(crate) fn choose_from<'a, T>(rng: &dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.pick(items.len())])
    }
}

/// Thread-local OS-seeded randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }

    fn fill(&self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}

/// Deterministic randomness for tests.
#[derive(Debug)]
pub struct SeededRandom {
    inner: Mutex<StdRng>,
}

impl SeededRandom {
    /// Creates a generator from a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn pick(&self, upper: usize) -> usize {
        self.inner.lock().expect("rng lock").gen_range(0..upper)
    }

    fn fill(&self, buf: &mut [u8]) {
        self.inner.lock().expect("rng lock").fill_bytes(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_random_is_deterministic() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let picks_a: Vec<usize> = (0..8).map(|_| a.pick(10)).collect();
        let picks_b: Vec<usize> = (0..8).map(|_| b.pick(10)).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_pick_stays_in_range() {
        let rng = SeededRandom::new(7);
        for _ in 0..100 {
            assert!(rng.pick(3) < 3);
        }
    }

    #[test]
    fn test_choose_empty_is_none() {
        let rng = SeededRandom::new(1);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
        assert!(choose_from(&rng, &empty).is_none());
    }

    #[test]
    fn test_fill_changes_buffer() {
        let rng = SeededRandom::new(9);
        let mut buf = [0u8; 16];
        rng.fill(&mut buf);
        assert_ne!(buf, [0u8; 16]);
    }
}
