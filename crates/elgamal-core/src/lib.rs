//! # ElGamal Core
//!
//! ElGamal digital signatures over a safe-prime multiplicative group.
//!
//! This crate provides:
//! - Prime generation and Miller-Rabin testing
//! - Safe-prime domain parameters and key generation
//! - Signing and verification of arbitrary byte strings
//! - The marker-delimited frame format used for key files and signed files
//!
//! ## Wire Format
//!
//! Every value is stored as `MARKER | TAG | VALUE | MARKER`, where the
//! marker is `de ad be ef` by default and the value is the big-endian
//! magnitude of an unsigned integer.
//!
//! - Public key: `frame(P, p) ++ frame(G, g) ++ frame(Y, y)`
//! - Private key: `frame(P, p) ++ frame(G, g) ++ frame(X, x)`
//! - Signed file: `message ++ frame(A, a) ++ frame(B, b)`
//!
//! ## Example
//!
//! ```rust,no_run
//! use elgamal_core::{EngineConfig, SignatureEngine};
//! use rand::rngs::OsRng;
//!
//! let engine = SignatureEngine::new(EngineConfig::default())?;
//! let key_pair = engine.generate_key_pair(&mut OsRng)?;
//!
//! let signed = engine.sign(b"message", &key_pair.private_key(), &mut OsRng)?;
//! engine.verify(&signed, &key_pair.public_key())?;
//! # Ok::<(), elgamal_core::Error>(())
//! ```

pub mod arith;
pub mod config;
pub mod engine;
pub mod error;
pub mod files;
pub mod keygen;
pub mod prime;
pub mod sign;
pub mod types;
pub mod wire;

pub use config::EngineConfig;
pub use engine::SignatureEngine;
pub use error::{Error, Result};
pub use types::{DomainParameters, KeyFile, KeyPair, PrivateKey, PublicKey, Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
