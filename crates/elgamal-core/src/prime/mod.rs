//! Prime generation and big-integer sampling
//!
//! Provides the number-theoretic building blocks for key generation:
//! - Probable prime generation of an exact bit length
//! - Miller-Rabin primality testing
//! - Unbiased sampling of integers in an inclusive range

mod miller_rabin;

pub use miller_rabin::is_prime;

use crate::{EngineConfig, Error, Result};
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;
use tracing::debug;

/// Draw budget for rejection sampling. Each draw is accepted with
/// probability above 1/2, so exhausting it means the RNG is broken.
pub const SAMPLE_DRAW_LIMIT: usize = 256;

/// Odd primes used to screen candidates before Miller-Rabin
const SMALL_PRIMES: [u32; 53] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// Generates probable primes of a fixed bit length
#[derive(Debug, Clone)]
pub struct PrimeGenerator {
    candidate_rounds: usize,
    max_attempts: usize,
}

impl PrimeGenerator {
    /// Create a generator from engine settings
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            candidate_rounds: config.candidate_rounds,
            max_attempts: config.max_attempts,
        }
    }

    /// Return an odd probable prime with exactly `bits` bits.
    ///
    /// Candidates are random odd integers with the top bit set, screened by
    /// trial division and then Miller-Rabin.
    pub fn generate_probable_prime<R: CryptoRngCore + ?Sized>(
        &self,
        bits: usize,
        rng: &mut R,
    ) -> Result<BigUint> {
        if bits < 2 {
            return Err(Error::InvalidConfig(format!(
                "Cannot generate an odd prime of {} bits",
                bits
            )));
        }

        let bits = bits as u64;
        for attempt in 1..=self.max_attempts {
            let mut candidate = rng.gen_biguint(bits);
            candidate.set_bit(bits - 1, true);
            candidate.set_bit(0, true);

            let accepted = match trial_division(&candidate) {
                Some(verdict) => verdict,
                None => is_prime(&candidate, self.candidate_rounds, rng),
            };
            if accepted {
                debug!(bits, attempt, "Found probable prime");
                return Ok(candidate);
            }
        }

        Err(Error::RetryBudgetExhausted {
            operation: "probable prime generation",
            attempts: self.max_attempts,
        })
    }
}

/// Decide `n` by small-prime division when possible. `n` must be odd.
pub(crate) fn trial_division(n: &BigUint) -> Option<bool> {
    for &p in SMALL_PRIMES.iter() {
        if (n % p).is_zero() {
            return Some(*n == BigUint::from(p));
        }
    }
    if n.bits() <= 8 {
        // Odd, not divisible by any odd prime below 256, and at most 255
        return Some(!n.is_one());
    }
    None
}

/// Sample uniformly from the inclusive range `[min, max]`.
///
/// Draws random bit strings as wide as the span and rejects those above
/// it, so no value is favoured.
pub fn uniform_in_range<R: CryptoRngCore + ?Sized>(
    min: &BigUint,
    max: &BigUint,
    rng: &mut R,
) -> Result<BigUint> {
    if min > max {
        return Err(Error::InvalidConfig(format!(
            "Empty sampling range [{}, {}]",
            min, max
        )));
    }

    let span = max - min;
    if span.is_zero() {
        return Ok(min.clone());
    }

    let width = span.bits();
    for _ in 0..SAMPLE_DRAW_LIMIT {
        let draw = rng.gen_biguint(width);
        if draw <= span {
            return Ok(min + draw);
        }
    }

    Err(Error::RetryBudgetExhausted {
        operation: "uniform range sampling",
        attempts: SAMPLE_DRAW_LIMIT,
    })
}
