//! # Stochastic Module
//!
//! Random number generation for the Monte Carlo transport.
//!
//! Every particle carries the seed of its own generator, so any single
//! trajectory can be replayed in isolation. The batch driver derives those
//! per-particle seeds from one master generator before propagation starts,
//! which keeps results independent of execution order and thread count.
//!
//! ## Sampling primitives
//!
//! - Uniform U(0,1) with 53-bit resolution
//! - Isotropic unit directions
//!
//! `RandomGenerator` also implements `rand::RngCore` and `rand::SeedableRng`,
//! so the helpers from `rand::Rng` are available on it.
//!
//! ## References
//!
//! [1] Blackman, D., Vigna, S. "Scrambled Linear Pseudorandom Number
//!     Generators", ACM TOMS 47 (2021)

use std::f64::consts::PI;

use rand::{Error, RngCore, SeedableRng};

use crate::types::Vec3;

/// Pseudo-random number generator (xoshiro256**)
///
/// Fast, high-quality PRNG suitable for Monte Carlo simulations.
/// Period: 2^256 - 1
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    state: [u64; 4],
}

impl RandomGenerator {
    /// Create new RNG with seed
    pub fn new(seed: u64) -> Self {
        // Initialize state using SplitMix64
        let mut s = seed;
        let mut state = [0u64; 4];
        for slot in state.iter_mut() {
            s = s.wrapping_add(0x9e3779b97f4a7c15);
            let mut z = s;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
            *slot = z ^ (z >> 31);
        }
        Self { state }
    }

    #[inline]
    fn next_raw(&mut self) -> u64 {
        let result = self.state[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);

        result
    }

    /// Draw a fresh seed for a child generator
    pub fn next_seed(&mut self) -> u64 {
        self.next_raw()
    }

    /// Generate uniform [0, 1)
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        (self.next_raw() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Generate uniform in range [a, b)
    pub fn uniform_range(&mut self, a: f64, b: f64) -> f64 {
        a + (b - a) * self.uniform()
    }

    /// Isotropic unit vector on the full sphere
    pub fn isotropic_direction(&mut self) -> Vec3 {
        let cos_theta = self.uniform_range(-1.0, 1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = 2.0 * PI * self.uniform();
        Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new(42)  // Reproducible default
    }
}

impl RngCore for RandomGenerator {
    fn next_u32(&mut self) -> u32 {
        (self.next_raw() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_raw()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_raw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for RandomGenerator {
    type Seed = [u8; 32];

    fn from_seed(seed: Self::Seed) -> Self {
        let mut state = [0u64; 4];
        for (slot, chunk) in state.iter_mut().zip(seed.chunks_exact(8)) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            *slot = u64::from_le_bytes(word);
        }
        // The all-zero state is a fixed point of xoshiro
        if state.iter().all(|&w| w == 0) {
            return Self::new(0);
        }
        Self { state }
    }

    fn seed_from_u64(seed: u64) -> Self {
        Self::new(seed)
    }
}

// ============================================================================
// TESTS
// ============================================================================
