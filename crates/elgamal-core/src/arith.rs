//! Extended Euclid and modular inverses

use crate::{Error, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

/// Iterative extended Euclidean algorithm.
///
/// Returns `(gcd, coef_a, coef_b)` with `coef_a * a + coef_b * b = gcd`.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let quotient = old_r.div_floor(&r);

        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);

        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);

        let next_t = &old_t - &quotient * &t;
        old_t = std::mem::replace(&mut t, next_t);
    }

    // Keep the gcd non-negative for negative inputs
    if old_r.sign() == Sign::Minus {
        (-old_r, -old_s, -old_t)
    } else {
        (old_r, old_s, old_t)
    }
}

/// Inverse of `r` modulo `n`, reduced into `[0, n)`.
///
/// Callers only ask for inverses they have already checked to exist, so a
/// gcd other than one is reported as an internal error.
pub fn mod_inverse(r: &BigUint, n: &BigUint) -> Result<BigUint> {
    let modulus = BigInt::from(n.clone());
    let (gcd, coef, _) = extended_gcd(&BigInt::from(r.clone()), &modulus);
    if !gcd.is_one() {
        return Err(Error::Internal(format!(
            "no inverse of {} modulo {}: gcd is {}",
            r, n, gcd
        )));
    }

    coef.mod_floor(&modulus)
        .to_biguint()
        .ok_or_else(|| Error::Internal("reduced inverse is negative".into()))
}
