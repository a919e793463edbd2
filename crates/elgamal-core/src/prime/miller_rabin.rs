//! Miller-Rabin probabilistic primality test

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand_core::CryptoRngCore;

/// Split `n - 1` into `2^s * t` with `t` odd. `n_minus_one` must be non-zero.
pub(crate) fn decompose(n_minus_one: &BigUint) -> (u64, BigUint) {
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    (s, n_minus_one >> s)
}

/// Miller-Rabin test with `rounds` random witnesses drawn from `[2, n-2]`.
///
/// Returns `false` as soon as a witness proves `n` composite. A composite
/// survives all rounds with probability at most `4^-rounds`.
pub fn is_prime<R: CryptoRngCore + ?Sized>(n: &BigUint, rounds: usize, rng: &mut R) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u8);

    if *n < two {
        return false;
    }
    if *n == two || *n == BigUint::from(3u8) {
        return true;
    }
    if n.is_even() {
        return false;
    }

    let n_minus_one = n - &one;
    let (s, t) = decompose(&n_minus_one);

    for _ in 0..rounds {
        // Upper bound is exclusive: witnesses cover [2, n-2]
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut y = a.modpow(&t, n);
        if y == one || y == n_minus_one {
            continue;
        }

        let mut j = 1;
        while j < s && y != n_minus_one {
            y = (&y * &y) % n;
            if y == one {
                return false;
            }
            j += 1;
        }
        if y != n_minus_one {
            return false;
        }
    }

    true
}
