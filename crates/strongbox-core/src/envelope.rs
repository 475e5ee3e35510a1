//! Authenticated encryption of backup artifacts
//!
//! Artifacts are sealed with AES-256-GCM under a key derived from a
//! configured secret. The wire layout is fixed:
//!
//! ```text
//! bytes[0..12]   IV (fresh per artifact)
//! bytes[12..28]  authentication tag
//! bytes[28..]    ciphertext
//! ```
//!
//! Inputs shorter than [`HEADER_LEN`] are rejected before the cipher is
//! touched. Any tag mismatch is reported as
//! [`BackupError::AuthenticationFailed`] with no further detail.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{AeadInPlace, KeyInit, OsRng, generic_array::GenericArray, rand_core::RngCore},
};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{BackupError, BackupResult};
use crate::secret::SecretString;

/// Length of the per-artifact IV.
pub const IV_LEN: usize = 12;
/// Length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;
/// Minimum length of a well-formed envelope (IV plus tag).
pub const HEADER_LEN: usize = IV_LEN + TAG_LEN;

const KEY_DERIVATION_SALT: &[u8] = b"strongbox/backup-key/v1";

/// AES-256 key, erased from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Derive the key from the configured backup secret.
    ///
    /// The derivation is a salted SHA-256 of the secret: the same secret
    /// always yields the same key, and rotating the secret makes every
    /// artifact produced under the old one undecryptable.
    #[must_use]
    pub fn derive(secret: &SecretString) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_DERIVATION_SALT);
        hasher.update(secret.expose_as_str().as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Seals and opens backup envelopes.
///
/// Built once per process from the derived key and shared read-only by the
/// backup writer and the restore decoder.
#[derive(Clone)]
pub struct EnvelopeCipher {
    cipher: Aes256Gcm,
}

impl EnvelopeCipher {
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
        }
    }

    /// Derive the key from `secret` and build the cipher.
    pub fn from_secret(secret: &SecretString) -> Self {
        Self::new(&EncryptionKey::derive(secret))
    }

    /// Seal `plaintext` into `IV ‖ tag ‖ ciphertext`.
    ///
    /// A fresh random IV is drawn from the OS for every call. The OS RNG
    /// panics if the entropy source is unavailable, which is treated as
    /// fatal.
    pub fn encrypt(&self, plaintext: &[u8]) -> BackupResult<Vec<u8>> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut envelope = Vec::with_capacity(HEADER_LEN + plaintext.len());
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&[0u8; TAG_LEN]);
        envelope.extend_from_slice(plaintext);

        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut envelope[HEADER_LEN..])
            .map_err(|_| BackupError::EncryptionFailed)?;
        envelope[IV_LEN..HEADER_LEN].copy_from_slice(&tag);

        Ok(envelope)
    }

    /// Open an envelope produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// - [`BackupError::InvalidEnvelope`] if `envelope` is shorter than
    ///   [`HEADER_LEN`]; the cipher is not consulted.
    /// - [`BackupError::AuthenticationFailed`] if the tag does not verify.
    pub fn decrypt(&self, envelope: &[u8]) -> BackupResult<Vec<u8>> {
        if envelope.len() < HEADER_LEN {
            return Err(BackupError::InvalidEnvelope {
                len: envelope.len(),
                min: HEADER_LEN,
            });
        }

        let (iv, rest) = envelope.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut plaintext = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(iv),
                b"",
                &mut plaintext,
                GenericArray::from_slice(tag),
            )
            .map_err(|_| BackupError::AuthenticationFailed)?;

        Ok(plaintext)
    }
}

impl fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCipher")
            .field("algorithm", &"AES-256-GCM")
            .finish()
    }
}
