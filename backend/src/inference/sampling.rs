//! Seeded sampling that reproduces CPython's `random` module exactly.
//!
//! Simulated estimates must agree with those produced by seeding CPython's
//! Mersenne Twister with an integer and drawing through `random.choices`.
//! [`PyMt19937`] follows the same seeding and float construction, and
//! [`weighted_choice`] follows the same cumulative-weight bisection.

use rand::rand_core::impls;
use rand::{RngCore, SeedableRng};

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

/// MT19937 seeded the way CPython seeds it from an integer.
#[derive(Clone)]
pub struct PyMt19937 {
    state: [u32; N],
    index: usize,
}

impl PyMt19937 {
    pub fn from_seed_value(seed: u64) -> Self {
        // Little-endian 32-bit words, with no zero high word.
        let low = seed as u32;
        let high = (seed >> 32) as u32;
        if high == 0 {
            Self::from_key(&[low])
        } else {
            Self::from_key(&[low, high])
        }
    }

    fn from_base(seed: u32) -> Self {
        let mut state = [0u32; N];
        state[0] = seed;
        for i in 1..N {
            let prev = state[i - 1];
            state[i] = 1_812_433_253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        Self { state, index: N }
    }

    fn from_key(key: &[u32]) -> Self {
        let mut rng = Self::from_base(19_650_218);
        let mt = &mut rng.state;

        let mut i = 1;
        let mut j = 0;
        for _ in 0..N.max(key.len()) {
            let prev = mt[i - 1];
            mt[i] = (mt[i] ^ (prev ^ (prev >> 30)).wrapping_mul(1_664_525))
                .wrapping_add(key[j])
                .wrapping_add(j as u32);
            i += 1;
            j += 1;
            if i >= N {
                mt[0] = mt[N - 1];
                i = 1;
            }
            if j >= key.len() {
                j = 0;
            }
        }
        for _ in 0..N - 1 {
            let prev = mt[i - 1];
            mt[i] = (mt[i] ^ (prev ^ (prev >> 30)).wrapping_mul(1_566_083_941))
                .wrapping_sub(i as u32);
            i += 1;
            if i >= N {
                mt[0] = mt[N - 1];
                i = 1;
            }
        }
        mt[0] = UPPER_MASK;

        rng
    }

    fn twist(&mut self) {
        for kk in 0..N {
            let y = (self.state[kk] & UPPER_MASK) | (self.state[(kk + 1) % N] & LOWER_MASK);
            let mut next = self.state[(kk + M) % N] ^ (y >> 1);
            if y & 1 != 0 {
                next ^= MATRIX_A;
            }
            self.state[kk] = next;
        }
        self.index = 0;
    }

    fn next_word(&mut self) -> u32 {
        if self.index >= N {
            self.twist();
        }
        let mut y = self.state[self.index];
        self.index += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^ (y >> 18)
    }

    /// Uniform float in `[0, 1)` with 53 bits of precision, built from two draws.
    pub fn next_f64(&mut self) -> f64 {
        let a = (self.next_word() >> 5) as f64;
        let b = (self.next_word() >> 6) as f64;
        (a * 67_108_864.0 + b) * (1.0 / 9_007_199_254_740_992.0)
    }
}

impl RngCore for PyMt19937 {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        impls::fill_bytes_via_next(self, dst)
    }
}

impl SeedableRng for PyMt19937 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::from_seed_value(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::from_seed_value(state)
    }
}

/// Picks one candidate with probability proportional to its weight.
///
/// Returns `None` for an empty list or when the weights do not add up to a
/// positive finite total.
pub fn weighted_choice<T: Copy>(rng: &mut PyMt19937, candidates: &[(T, f64)]) -> Option<T> {
    let last = candidates.len().checked_sub(1)?;

    let cumulative: Vec<f64> = candidates
        .iter()
        .scan(0.0, |running, &(_, weight)| {
            *running += weight;
            Some(*running)
        })
        .collect();
    let total = cumulative[last];
    if !total.is_finite() || total <= 0.0 {
        return None;
    }

    let draw = rng.next_f64() * total;
    let index = cumulative[..last].partition_point(|&c| c <= draw);
    Some(candidates[index].0)
}
