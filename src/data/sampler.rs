// ============================================================
// Layer 4 — Infinite Sampler
// ============================================================
// An index stream that never ends:
//
//   perm₀ = shuffle(0..L)   perm₁ = shuffle(0..L)   ...
//   stream = perm₀ ++ perm₁ ++ perm₂ ++ ...
//
// A cursor walks the current permutation; when it reaches L a
// fresh permutation is drawn and the cursor resets to 0. A batch
// that straddles the boundary is completed from the new
// permutation, so batches are never short.
//
// Each sampler owns its own RNG. The content and style samplers
// are therefore independent and their pairing is incidental.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::StyleError;

pub struct InfiniteSampler {
    order:  Vec<usize>,
    cursor: usize,
    cycles: usize,
    rng:    StdRng,
}

impl InfiniteSampler {
    /// Sampler over `[0, len)` seeded from OS entropy.
    pub fn new(len: usize) -> Result<Self, StyleError> {
        Self::with_rng(len, StdRng::from_entropy())
    }

    /// Reproducible sampler
    #[cfg(test)]
    pub fn with_seed(len: usize, seed: u64) -> Result<Self, StyleError> {
        Self::with_rng(len, StdRng::seed_from_u64(seed))
    }

    fn with_rng(len: usize, mut rng: StdRng) -> Result<Self, StyleError> {
        if len == 0 {
            return Err(StyleError::EmptyDataset("<sampler>".into()));
        }
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut rng);
        Ok(Self { order, cursor: 0, cycles: 0, rng })
    }

    /// Number of completed permutations so far
    pub fn cycles(&self) -> usize { self.cycles }

    /// Next index of the stream
    pub fn next_index(&mut self) -> usize {
        if self.cursor == self.order.len() {
            self.order.shuffle(&mut self.rng);
            self.cursor = 0;
            self.cycles += 1;
        }
        let idx = self.order[self.cursor];
        self.cursor += 1;
        idx
    }

    /// Exactly `batch_size` consecutive indices of the stream.
    pub fn next_batch(&mut self, batch_size: usize) -> Vec<usize> {
        (0..batch_size).map(|_| self.next_index()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_zero_length_is_rejected() {
        assert!(InfiniteSampler::new(0).is_err());
    }

    #[test]
    fn test_batches_are_never_short() {
        for len in 1..=7 {
            for batch in 1..=len {
                let mut s = InfiniteSampler::with_seed(len, 7).unwrap();
                for _ in 0..50 {
                    assert_eq!(s.next_batch(batch).len(), batch);
                }
            }
        }
    }

    #[test]
    fn test_each_cycle_is_a_permutation() {
        let len = 13;
        let mut s = InfiniteSampler::with_seed(len, 42).unwrap();
        for _ in 0..5 {
            let seen: BTreeSet<usize> = (0..len).map(|_| s.next_batch(1)[0]).collect();
            assert_eq!(seen, (0..len).collect::<BTreeSet<_>>());
        }
    }

    #[test]
    fn test_batch_straddles_the_wrap() {
        // L=5, B=3: the second batch takes 2 from cycle 0 and 1 from cycle 1
        let mut s = InfiniteSampler::with_seed(5, 1).unwrap();
        let _ = s.next_batch(3);
        assert_eq!(s.cycles(), 0);
        let b = s.next_batch(3);
        assert_eq!(b.len(), 3);
        assert_eq!(s.cycles(), 1);
        assert!(b.iter().all(|&i| i < 5));
    }

    #[test]
    fn test_many_draws_never_run_dry() {
        let mut s = InfiniteSampler::with_seed(3, 9).unwrap();
        for _ in 0..10_000 {
            assert!(s.next_index() < 3);
        }
        assert!(s.cycles() >= 3332);
    }

    #[test]
    fn test_independent_samplers_diverge() {
        let mut a = InfiniteSampler::new(64).unwrap();
        let mut b = InfiniteSampler::new(64).unwrap();
        let xs: Vec<_> = (0..8).map(|_| a.next_batch(64)).collect();
        let ys: Vec<_> = (0..8).map(|_| b.next_batch(64)).collect();
        assert_ne!(xs, ys);
    }
}
