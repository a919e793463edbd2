//! Key generation over a safe-prime group
//!
//! 1. Search for a safe prime `p = 2q + 1`
//! 2. Find a generator `g` of the order-`q` subgroup
//! 3. Draw the secret exponent `x` and compute `y = g^x mod p`

use crate::prime::{is_prime, trial_division, uniform_in_range, PrimeGenerator};
use crate::{DomainParameters, EngineConfig, Error, KeyPair, Result};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;
use rand_core::CryptoRngCore;
use tracing::{debug, info, instrument};

/// Generate fresh domain parameters and a key pair
#[instrument(skip(rng), fields(bits = config.prime_bits))]
pub fn generate_key_pair<R: CryptoRngCore + ?Sized>(
    config: &EngineConfig,
    rng: &mut R,
) -> Result<KeyPair> {
    config.validate()?;

    let params = generate_domain_parameters(config, rng)?;
    let x = generate_secret_exponent(&params, config.max_attempts, rng)?;
    let y = params.g.modpow(&x, &params.p);

    info!(bits = params.bits(), "Key pair generated");

    Ok(KeyPair { params, x, y })
}

/// Safe prime plus a generator of its order-`q` subgroup
pub fn generate_domain_parameters<R: CryptoRngCore + ?Sized>(
    config: &EngineConfig,
    rng: &mut R,
) -> Result<DomainParameters> {
    let (p, q) = generate_safe_prime(config, rng)?;
    let g = find_generator(&p, &q, config.max_attempts, rng)?;
    Ok(DomainParameters { p, q, g })
}

/// Repeat `q <- prime(L - 1), p <- 2q + 1` until `p` passes Miller-Rabin
fn generate_safe_prime<R: CryptoRngCore + ?Sized>(
    config: &EngineConfig,
    rng: &mut R,
) -> Result<(BigUint, BigUint)> {
    let primes = PrimeGenerator::new(config);

    for attempt in 1..=config.max_attempts {
        let q = primes.generate_probable_prime(config.prime_bits - 1, rng)?;
        let p = (&q << 1u32) + 1u32;

        let accepted = match trial_division(&p) {
            Some(verdict) => verdict,
            None => is_prime(&p, config.rounds, rng),
        };
        if accepted {
            debug!(attempt, "Found safe prime");
            return Ok((p, q));
        }
    }

    Err(Error::RetryBudgetExhausted {
        operation: "safe prime search",
        attempts: config.max_attempts,
    })
}

/// Square random elements until one generates the order-`q` subgroup.
///
/// Squares always satisfy `g^q = 1`. With `q` prime the only orders left
/// are 1, 2 and `q`, so rejecting `g = 1` and `g^2 = 1` leaves order `q`.
fn find_generator<R: CryptoRngCore + ?Sized>(
    p: &BigUint,
    q: &BigUint,
    max_attempts: usize,
    rng: &mut R,
) -> Result<BigUint> {
    let two = BigUint::from(2u8);
    let upper = p - &two;

    for attempt in 1..=max_attempts {
        let h = uniform_in_range(&two, &upper, rng)?;
        let g = h.modpow(&two, p);
        debug_assert!(g.modpow(q, p).is_one());
        if !g.is_one() && !g.modpow(&two, p).is_one() {
            debug!(attempt, "Found generator");
            return Ok(g);
        }
    }

    Err(Error::RetryBudgetExhausted {
        operation: "generator search",
        attempts: max_attempts,
    })
}

/// Draw `x` from `[1, p - 2]`, redrawing `x = 1` so that `1 < x < p - 1`
fn generate_secret_exponent<R: CryptoRngCore + ?Sized>(
    params: &DomainParameters,
    max_attempts: usize,
    rng: &mut R,
) -> Result<BigUint> {
    let one = BigUint::one();
    let upper = &params.p - 2u32;

    for _ in 0..max_attempts {
        let x = uniform_in_range(&one, &upper, rng)?;
        if !x.is_one() {
            return Ok(x);
        }
    }

    Err(Error::RetryBudgetExhausted {
        operation: "secret exponent sampling",
        attempts: max_attempts,
    })
}

/// Full check of the domain parameter invariants.
///
/// Runs Miller-Rabin on both `p` and `q`, so it costs about as much as
/// accepting the safe prime did.
pub fn validate_parameters<R: CryptoRngCore + ?Sized>(
    params: &DomainParameters,
    rounds: usize,
    rng: &mut R,
) -> Result<()> {
    let one = BigUint::one();
    let two = BigUint::from(2u8);

    if params.p != (&params.q << 1u32) + 1u32 {
        return Err(Error::corruption("P is not 2Q + 1"));
    }
    if !is_prime(&params.p, rounds, rng) {
        return Err(Error::corruption("P is not prime"));
    }
    if !is_prime(&params.q, rounds, rng) {
        return Err(Error::corruption("(P - 1) / 2 is not prime"));
    }
    if params.g.modpow(&two, &params.p) == one || params.g.modpow(&params.q, &params.p) != one {
        return Err(Error::corruption("G does not generate the order-Q subgroup"));
    }
    Ok(())
}
