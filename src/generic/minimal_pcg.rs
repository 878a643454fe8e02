//! A simple pseudorandom number generator.
//!
//! A translation of the *really* minimal C PCG32 implementation from
//! <https://www.pcg-random.org/>, implemented against the [rand_core] traits.
//!
//! PCG(32) is used as the default source of (pseudo)random numbers as it is simple, fast, and
//! deterministic across platforms --- solves with the same configuration take the same
//! decisions.
//! The searcher stores the generator and uses it for polarity and decision noise; substituting
//! a different [RngCore] implementation is all that's needed for a different source.

use rand::SeedableRng;
use rand_core::{impls, Error, RngCore};

/// State and increment.
#[derive(Default)]
pub struct MinimalPCG32 {
    state: u64,
    inc: u64,
}

impl RngCore for MinimalPCG32 {
    fn next_u32(&mut self) -> u32 {
        let old_state = self.state;

        self.state = old_state
            .wrapping_mul(6364136223846793005_u64)
            .wrapping_add(self.inc);

        let xorshifted = ((old_state >> 18) ^ old_state) >> 27;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for MinimalPCG32 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        /// Entirely unmotivated.
        const INCREMENT: u64 = 3215534235932367344;
        Self {
            state: (u64::from_le_bytes(seed)).wrapping_add(INCREMENT),
            inc: INCREMENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism() {
        let mut a = MinimalPCG32::from_seed(7_u64.to_le_bytes());
        let mut b = MinimalPCG32::from_seed(7_u64.to_le_bytes());
        for _ in 0..64 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn seed_sensitivity() {
        let mut a = MinimalPCG32::from_seed(1_u64.to_le_bytes());
        let mut b = MinimalPCG32::from_seed(2_u64.to_le_bytes());
        let differs = (0..16).any(|_| a.next_u32() != b.next_u32());
        assert!(differs);
    }
}
