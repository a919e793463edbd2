//! Core types for ElGamal keys and signatures

use crate::wire::{Fields, Tag, WireCodec};
use crate::{Error, Result};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use std::fmt;

/// Group parameters shared by a key pair and every signature it makes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParameters {
    /// Safe prime modulus, `p = 2q + 1`
    pub p: BigUint,
    /// Prime order of the subgroup generated by `g`
    pub q: BigUint,
    /// Generator of the order-`q` subgroup
    pub g: BigUint,
}

impl DomainParameters {
    /// Build parameters from `p` and `g`, deriving `q = (p - 1) / 2`
    pub fn new(p: BigUint, g: BigUint) -> Self {
        // Equal to (p - 1) / 2 for odd p, and cannot underflow
        let q = &p >> 1u32;
        Self { p, q, g }
    }

    /// `p - 1`, the modulus for exponent arithmetic
    pub fn exponent_modulus(&self) -> BigUint {
        &self.p - 1u32
    }

    /// Bit length of `p`
    pub fn bits(&self) -> u64 {
        self.p.bits()
    }

    /// Cheap structural checks for parameters read from untrusted bytes.
    /// Runs before `q` is derived, so `p` may be anything here.
    fn check_shape(p: &BigUint, g: &BigUint) -> Result<()> {
        if *p < BigUint::from(5u32) || p.is_even() {
            return Err(Error::corruption("modulus P is not an odd prime candidate"));
        }
        if g <= &BigUint::one() || g >= p {
            return Err(Error::corruption("generator G is out of range"));
        }
        Ok(())
    }

    fn from_fields(fields: &Fields) -> Result<Self> {
        let p = fields.require(Tag::P)?;
        let g = fields.require(Tag::G)?;
        Self::check_shape(p, g)?;
        Ok(Self::new(p.clone(), g.clone()))
    }
}

/// Verification key `(p, g, y)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub params: DomainParameters,
    /// `g^x mod p`
    pub y: BigUint,
}

impl PublicKey {
    /// Serialize as `frame(P) ++ frame(G) ++ frame(Y)`
    pub fn to_bytes(&self, codec: &WireCodec) -> Vec<u8> {
        codec.encode_frames(&[
            (Tag::P, &self.params.p),
            (Tag::G, &self.params.g),
            (Tag::Y, &self.y),
        ])
    }

    /// Parse a public key file
    pub fn from_bytes(codec: &WireCodec, data: &[u8]) -> Result<Self> {
        match KeyFile::from_bytes(codec, data)? {
            KeyFile::Public(key) => Ok(key),
            KeyFile::Private(_) => Err(Error::corruption(
                "expected a public key but found a private key",
            )),
        }
    }
}

/// Signing key `(p, g, x)`
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub params: DomainParameters,
    /// Secret exponent, `1 < x < p - 1`
    pub x: BigUint,
}

impl PrivateKey {
    /// Serialize as `frame(P) ++ frame(G) ++ frame(X)`
    pub fn to_bytes(&self, codec: &WireCodec) -> Vec<u8> {
        codec.encode_frames(&[
            (Tag::P, &self.params.p),
            (Tag::G, &self.params.g),
            (Tag::X, &self.x),
        ])
    }

    /// Parse a private key file
    pub fn from_bytes(codec: &WireCodec, data: &[u8]) -> Result<Self> {
        match KeyFile::from_bytes(codec, data)? {
            KeyFile::Private(key) => Ok(key),
            KeyFile::Public(_) => Err(Error::corruption(
                "expected a private key but found a public key",
            )),
        }
    }

    /// Derive the matching verification key
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            params: self.params.clone(),
            y: self.params.g.modpow(&self.x, &self.params.p),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("params", &self.params)
            .field("x", &"<redacted>")
            .finish()
    }
}

/// Freshly generated key material
#[derive(Clone)]
pub struct KeyPair {
    pub params: DomainParameters,
    pub x: BigUint,
    pub y: BigUint,
}

impl KeyPair {
    /// Public half
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            params: self.params.clone(),
            y: self.y.clone(),
        }
    }

    /// Private half
    pub fn private_key(&self) -> PrivateKey {
        PrivateKey {
            params: self.params.clone(),
            x: self.x.clone(),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("params", &self.params)
            .field("x", &"<redacted>")
            .field("y", &self.y)
            .finish()
    }
}

/// ElGamal signature `(a, b)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// `g^r mod p`
    pub a: BigUint,
    /// `(H(m) - x*a) * r^-1 mod (p - 1)`
    pub b: BigUint,
}

impl Signature {
    /// Serialize as `frame(A) ++ frame(B)`
    pub fn to_bytes(&self, codec: &WireCodec) -> Vec<u8> {
        codec.encode_frames(&[(Tag::A, &self.a), (Tag::B, &self.b)])
    }

    pub(crate) fn from_fields(fields: &Fields) -> Result<Self> {
        Ok(Self {
            a: fields.require(Tag::A)?.clone(),
            b: fields.require(Tag::B)?.clone(),
        })
    }
}

/// Either kind of key file, told apart by whether it carries `Y` or `X`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFile {
    Public(PublicKey),
    Private(PrivateKey),
}

impl KeyFile {
    /// Parse a key file; it must consist of frames only
    pub fn from_bytes(codec: &WireCodec, data: &[u8]) -> Result<Self> {
        if !codec.parse_message_prefix(data)?.is_empty() {
            return Err(Error::corruption("key file has bytes before its first frame"));
        }
        let fields = codec.parse_frames(data)?;
        let params = DomainParameters::from_fields(&fields)?;

        let key = match (fields.get(Tag::Y), fields.get(Tag::X)) {
            (Some(y), None) => {
                if y.is_zero() || *y >= params.p {
                    return Err(Error::corruption("public value Y is out of range"));
                }
                KeyFile::Public(PublicKey {
                    params,
                    y: y.clone(),
                })
            }
            (None, Some(x)) => {
                if x <= &BigUint::one() || *x >= params.exponent_modulus() {
                    return Err(Error::corruption("secret exponent X is out of range"));
                }
                KeyFile::Private(PrivateKey {
                    params,
                    x: x.clone(),
                })
            }
            (Some(_), Some(_)) => {
                return Err(Error::corruption("key file carries both X and Y"));
            }
            (None, None) => return Err(Error::corruption("key file carries neither X nor Y")),
        };

        if fields.len() != 3 {
            return Err(Error::corruption("key file carries unexpected fields"));
        }
        Ok(key)
    }

    /// Domain parameters of either key kind
    pub fn params(&self) -> &DomainParameters {
        match self {
            KeyFile::Public(key) => &key.params,
            KeyFile::Private(key) => &key.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // p = 23 = 2 * 11 + 1, g = 4 generates the order-11 subgroup
    fn toy_params() -> DomainParameters {
        DomainParameters::new(BigUint::from(23u32), BigUint::from(4u32))
    }

    fn toy_private() -> PrivateKey {
        PrivateKey {
            params: toy_params(),
            x: BigUint::from(7u32),
        }
    }

    #[test]
    fn test_derives_q() {
        let params = toy_params();
        assert_eq!(params.q, BigUint::from(11u32));
        assert_eq!(params.exponent_modulus(), BigUint::from(22u32));
        assert_eq!(params.bits(), 5);
    }

    #[test]
    fn test_public_key_from_private() {
        // 4^7 mod 23 = 8
        assert_eq!(toy_private().public_key().y, BigUint::from(8u32));
    }

    #[test]
    fn test_key_files_round_trip() {
        let codec = WireCodec::default();
        let private = toy_private();
        let public = private.public_key();

        let public_bytes = public.to_bytes(&codec);
        let private_bytes = private.to_bytes(&codec);
        assert_eq!(PublicKey::from_bytes(&codec, &public_bytes).unwrap(), public);
        assert_eq!(PrivateKey::from_bytes(&codec, &private_bytes).unwrap(), private);
    }

    #[test]
    fn test_key_file_layout() {
        let codec = WireCodec::default();
        let bytes = toy_private().public_key().to_bytes(&codec);
        let m = [0xde, 0xad, 0xbe, 0xef];
        let mut expected = Vec::new();
        for (tag, value) in [(0xdd, 23u8), (0xee, 4), (0xab, 8)] {
            expected.extend_from_slice(&m);
            expected.push(tag);
            expected.push(value);
            expected.extend_from_slice(&m);
        }
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_wrong_key_kind_is_rejected() {
        let codec = WireCodec::default();
        let private_bytes = toy_private().to_bytes(&codec);
        let public_bytes = toy_private().public_key().to_bytes(&codec);
        assert!(PublicKey::from_bytes(&codec, &private_bytes).unwrap_err().is_corruption());
        assert!(PrivateKey::from_bytes(&codec, &public_bytes).unwrap_err().is_corruption());
    }

    #[test]
    fn test_key_file_shape_checks() {
        let codec = WireCodec::default();
        let missing_g = codec.encode_frames(&[
            (Tag::P, &BigUint::from(23u32)),
            (Tag::Y, &BigUint::from(8u32)),
        ]);
        assert!(KeyFile::from_bytes(&codec, &missing_g).unwrap_err().is_corruption());

        let bad_generator = codec.encode_frames(&[
            (Tag::P, &BigUint::from(23u32)),
            (Tag::G, &BigUint::from(23u32)),
            (Tag::Y, &BigUint::from(8u32)),
        ]);
        assert!(KeyFile::from_bytes(&codec, &bad_generator).unwrap_err().is_corruption());

        let mut prefixed = b"junk".to_vec();
        prefixed.extend(toy_private().to_bytes(&codec));
        assert!(KeyFile::from_bytes(&codec, &prefixed).unwrap_err().is_corruption());

        let mut extra = toy_private().to_bytes(&codec);
        extra.extend(codec.encode_frame(Tag::A, &BigUint::from(1u8)));
        assert!(KeyFile::from_bytes(&codec, &extra).unwrap_err().is_corruption());
    }

    #[test]
    fn test_degenerate_modulus_is_corruption() {
        let codec = WireCodec::default();
        for p in [0u32, 1, 2, 4, 22] {
            let bytes = codec.encode_frames(&[
                (Tag::P, &BigUint::from(p)),
                (Tag::G, &BigUint::from(4u32)),
                (Tag::Y, &BigUint::from(8u32)),
            ]);
            let err = PublicKey::from_bytes(&codec, &bytes).unwrap_err();
            assert!(err.is_corruption(), "p = {} gave {:?}", p, err);
        }
    }

    #[test]
    fn test_key_values_out_of_range_are_corruption() {
        let codec = WireCodec::default();
        let params = toy_params();
        let key_file = |tag: Tag, value: u32| {
            codec.encode_frames(&[
                (Tag::P, &params.p),
                (Tag::G, &params.g),
                (tag, &BigUint::from(value)),
            ])
        };

        // 1 < x < p - 1
        for x in [0u32, 1, 22, 23, 99] {
            let err = PrivateKey::from_bytes(&codec, &key_file(Tag::X, x)).unwrap_err();
            assert!(err.is_corruption(), "x = {}", x);
        }
        assert!(PrivateKey::from_bytes(&codec, &key_file(Tag::X, 21)).is_ok());

        // 0 < y < p
        for y in [0u32, 23] {
            let err = PublicKey::from_bytes(&codec, &key_file(Tag::Y, y)).unwrap_err();
            assert!(err.is_corruption(), "y = {}", y);
        }
    }

    #[test]
    fn test_private_debug_is_redacted() {
        let rendered = format!("{:?}", toy_private());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("x: 7"));
    }
}
