//! Deterministic per-converter PRNG for byproduct draws.
//!
//! SplitMix64: 8 bytes of state, good statistical quality, trivially
//! serializable. Each converter gets its own stream derived from a world
//! seed and a stable instance index, so replays are reproducible and no
//! converter's draws depend on another's.

use crate::fixed::Fixed64;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// SplitMix64 pseudo-random number generator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Derive an independent stream for one converter instance.
    ///
    /// Mixing the index through one SplitMix round keeps neighbouring
    /// indices from producing correlated sequences.
    pub fn for_instance(world_seed: u64, instance: u64) -> Self {
        let mut mixer = Self::new(world_seed ^ instance.wrapping_mul(GOLDEN_GAMMA));
        Self::new(mixer.next_u64())
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// A uniform draw in `[0, 1)` at Q32.32 resolution.
    pub fn next_unit(&mut self) -> Fixed64 {
        let upper = (self.next_u64() >> 32) as i64;
        Fixed64::from_bits(upper)
    }

    /// Returns `true` iff a fresh unit draw is `< probability`.
    ///
    /// A draw is always consumed, even for probabilities of 0 or 1, so the
    /// stream position does not depend on recipe data.
    pub fn chance(&mut self, probability: Fixed64) -> bool {
        self.next_unit() < probability
    }

    pub fn state(&self) -> u64 {
        self.state
    }
}
