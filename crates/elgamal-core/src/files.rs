//! Key files and signed files on disk
//!
//! Reads are whole-buffer and happen before any arithmetic. Writes go to a
//! temporary sibling that is synced and renamed into place, so a failed
//! operation never leaves a truncated key or signed file behind.

use crate::types::KeyFile;
use crate::{PrivateKey, PublicKey, Result, SignatureEngine};
use digest::Digest;
use rand_core::CryptoRngCore;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// File name of the public key
pub const PUBLIC_KEY_FILE: &str = "elgamal.pub";

/// File name of the private key
pub const PRIVATE_KEY_FILE: &str = "elgamal";

/// Paths written by [`generate_key_files`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    pub public: PathBuf,
    pub private: PathBuf,
}

impl KeyPaths {
    /// Standard key file locations inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            public: dir.join(PUBLIC_KEY_FILE),
            private: dir.join(PRIVATE_KEY_FILE),
        }
    }
}

/// Generate a key pair and write both key files into `dir`
#[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub fn generate_key_files<D: Digest, R: CryptoRngCore + ?Sized>(
    engine: &SignatureEngine<D>,
    dir: impl AsRef<Path>,
    rng: &mut R,
) -> Result<KeyPaths> {
    let paths = KeyPaths::in_dir(&dir);
    let kp = engine.generate_key_pair(rng)?;
    let codec = engine.codec();

    write_atomic(&paths.public, &kp.public_key().to_bytes(codec))?;
    if let Err(e) = write_atomic(&paths.private, &kp.private_key().to_bytes(codec)) {
        // Keep the pair together: no public key without its private half
        let _ = fs::remove_file(&paths.public);
        return Err(e);
    }

    info!(
        public = %paths.public.display(),
        private = %paths.private.display(),
        bits = kp.params.bits(),
        "Key files written"
    );
    Ok(paths)
}

/// Read and decode a key file of either kind
pub fn read_key_file<D: Digest>(
    engine: &SignatureEngine<D>,
    path: impl AsRef<Path>,
) -> Result<KeyFile> {
    let data = fs::read(path.as_ref())?;
    KeyFile::from_bytes(engine.codec(), &data)
}

/// Read and decode a public key file
pub fn read_public_key<D: Digest>(
    engine: &SignatureEngine<D>,
    path: impl AsRef<Path>,
) -> Result<PublicKey> {
    let data = fs::read(path.as_ref())?;
    PublicKey::from_bytes(engine.codec(), &data)
}

/// Read and decode a private key file
pub fn read_private_key<D: Digest>(
    engine: &SignatureEngine<D>,
    path: impl AsRef<Path>,
) -> Result<PrivateKey> {
    let data = fs::read(path.as_ref())?;
    PrivateKey::from_bytes(engine.codec(), &data)
}

/// Replace the contents of `message_path` with its signed form
#[instrument(skip_all, fields(message = %message_path.as_ref().display()))]
pub fn sign_file<D: Digest, R: CryptoRngCore + ?Sized>(
    engine: &SignatureEngine<D>,
    message_path: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
    rng: &mut R,
) -> Result<()> {
    let key = read_private_key(engine, key_path)?;
    let message = fs::read(message_path.as_ref())?;

    let signed = engine.sign(&message, &key, rng)?;
    write_atomic(message_path.as_ref(), &signed)?;

    info!(
        message_len = message.len(),
        signed_len = signed.len(),
        "File signed"
    );
    Ok(())
}

/// Check the signature embedded in `message_path`
#[instrument(skip_all, fields(message = %message_path.as_ref().display()))]
pub fn verify_file<D: Digest>(
    engine: &SignatureEngine<D>,
    message_path: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
) -> Result<()> {
    let key = read_public_key(engine, key_path)?;
    let signed = fs::read(message_path.as_ref())?;

    engine.verify(&signed, &key)?;
    info!("Signature valid");
    Ok(())
}

/// Write `bytes` to `path` through a synced temporary file and a rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = temp_sibling(path);
    debug!(path = %path.display(), temp = %temp_path.display(), "Writing atomically");

    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
