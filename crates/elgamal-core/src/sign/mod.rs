//! ElGamal signing and verification
//!
//! Signed data is the message followed by two frames:
//! `message ++ frame(A, a) ++ frame(B, b)`.

use crate::arith::mod_inverse;
use crate::prime::uniform_in_range;
use crate::wire::{to_magnitude, Tag, WireCodec};
use crate::{Error, PrivateKey, PublicKey, Result, Signature};
use digest::Digest;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;
use tracing::{debug, instrument, warn};

/// Hash `message` with `D` and read the digest as a big-endian integer
pub fn digest_to_integer<D: Digest>(message: &[u8]) -> BigUint {
    BigUint::from_bytes_be(&D::digest(message))
}

/// Append a fresh signature to `message`.
///
/// Messages that already contain the frame marker are refused: the
/// verifier would cut the message short at that marker.
#[instrument(skip_all, fields(len = message.len()))]
pub fn sign_message<D: Digest, R: CryptoRngCore + ?Sized>(
    codec: &WireCodec,
    key: &PrivateKey,
    message: &[u8],
    max_attempts: usize,
    rng: &mut R,
) -> Result<Vec<u8>> {
    if !codec.can_frame(message) {
        return Err(Error::Unframeable(
            "message contains the frame marker (already signed?)".into(),
        ));
    }

    let signature = create_signature::<D, R>(codec, key, message, max_attempts, rng)?;
    let frames = signature.to_bytes(codec);

    let mut signed = Vec::with_capacity(message.len() + frames.len());
    signed.extend_from_slice(message);
    signed.extend_from_slice(&frames);
    Ok(signed)
}

/// Compute `(a, b)` for `message` under `key`.
///
/// The ephemeral `r` is redrawn until it is invertible modulo `p - 1` and
/// neither component's bytes contain the frame marker.
pub fn create_signature<D: Digest, R: CryptoRngCore + ?Sized>(
    codec: &WireCodec,
    key: &PrivateKey,
    message: &[u8],
    max_attempts: usize,
    rng: &mut R,
) -> Result<Signature> {
    let params = &key.params;
    let n = params.exponent_modulus();
    let upper = &params.p - 2u32;
    let one = BigUint::one();

    let digest = digest_to_integer::<D>(message);
    debug!(digest = %hex::encode(digest.to_bytes_be()), "Message digest");

    let h = &digest % &n;

    for attempt in 1..=max_attempts {
        let r = uniform_in_range(&one, &upper, rng)?;
        if !r.gcd(&n).is_one() {
            continue;
        }

        let a = params.g.modpow(&r, &params.p);
        let xa = (&key.x * &a) % &n;
        // H(m) - x*a, kept in [0, p-2]
        let difference = (&h + &n - xa) % &n;
        let r_inv = mod_inverse(&r, &n)?;
        let b = (difference * r_inv) % &n;

        if !frames_cleanly(codec, &a) || !frames_cleanly(codec, &b) {
            warn!(attempt, "Signature component collides with frame marker, redrawing");
            continue;
        }

        debug!(attempt, "Ephemeral exponent accepted");
        return Ok(Signature { a, b });
    }

    Err(Error::RetryBudgetExhausted {
        operation: "ephemeral exponent sampling",
        attempts: max_attempts,
    })
}

/// Split signed data and check the signature against `key`
#[instrument(skip_all, fields(len = signed.len()))]
pub fn verify_message<D: Digest>(
    codec: &WireCodec,
    key: &PublicKey,
    signed: &[u8],
) -> Result<()> {
    let message = codec.parse_message_prefix(signed)?;
    let fields = codec.parse_frames(signed)?;
    if fields.tags().any(|tag| tag != Tag::A && tag != Tag::B) {
        return Err(Error::corruption("signature carries unexpected fields"));
    }
    let signature = Signature::from_fields(&fields)?;

    verify_signature::<D>(key, message, &signature)
}

/// Check `g^H(m) == y^a * a^b (mod p)`
pub fn verify_signature<D: Digest>(
    key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<()> {
    let params = &key.params;
    let Signature { a, b } = signature;

    if a.is_zero() || *a >= params.p {
        return Err(Error::corruption("signature component A is out of range"));
    }
    if *b >= params.exponent_modulus() {
        return Err(Error::corruption("signature component B is out of range"));
    }

    let digest = digest_to_integer::<D>(message);
    let f1 = params.g.modpow(&digest, &params.p);
    let f2 = (key.y.modpow(a, &params.p) * a.modpow(b, &params.p)) % &params.p;

    if f1 != f2 {
        debug!("Signature equation does not hold");
        return Err(Error::corruption("signature does not match message"));
    }
    Ok(())
}

/// Whether `value` can sit in a frame without being split by the marker
pub(crate) fn frames_cleanly(codec: &WireCodec, value: &BigUint) -> bool {
    codec.can_frame(&to_magnitude(value))
}
