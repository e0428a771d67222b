use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};

use crate::error::{error_codes, PensignError, PensignResult};
use crate::pin::{PinDigest, PIN_DIGEST_LENGTH};

/// Length of the AES-GCM nonce in bytes
pub const NONCE_LENGTH: usize = 12;

/// Length of the AES-GCM authentication tag in bytes
pub const TAG_LENGTH: usize = 16;

/// AES-256-GCM cipher keyed by a PIN digest
///
/// The digest is used directly as the 256-bit key (`PIN_DIGEST_LENGTH` equals
/// the key length by construction). Sealing is randomized: every call draws a
/// fresh 12-byte nonce and prepends it to the ciphertext, so the nonce is
/// always recoverable at open time and the same plaintext never seals to the
/// same bytes twice.
///
/// Because GCM is an authenticated mode, opening with a digest derived from a
/// different PIN fails outright instead of yielding garbage plaintext. That
/// failure is surfaced as [`PensignError::IncorrectPin`]: within this crate
/// the only keys fed to the cipher are PIN digests, so an authentication
/// failure *is* a wrong PIN (or a corrupted artifact, which the caller must
/// treat the same way).
///
/// # Examples
///
/// ```
/// use pensign::aes::AesGcm;
/// use pensign::pin::derive_key_from_pin;
///
/// let cipher = AesGcm::new(&derive_key_from_pin(1234));
/// let sealed = cipher.seal(b"private key bytes").unwrap();
/// let opened = cipher.open(&sealed).unwrap();
/// assert_eq!(opened, b"private key bytes");
/// ```
#[derive(Clone)]
pub struct AesGcm {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for AesGcm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcm")
            .field("cipher", &"[AES-256-GCM Cipher]")
            .finish()
    }
}

impl AesGcm {
    /// Create a new cipher keyed by the given PIN digest
    pub fn new(digest: &PinDigest) -> Self {
        debug_assert_eq!(digest.as_bytes().len(), PIN_DIGEST_LENGTH);
        let key = Key::<Aes256Gcm>::from_slice(digest.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Seal plaintext under the PIN digest
    ///
    /// Draws a fresh random nonce and returns `nonce || ciphertext || tag`.
    /// Opening with the same digest reproduces the exact original plaintext;
    /// the sealing itself is randomized.
    ///
    /// # Errors
    ///
    /// Returns a `Sealing` error only if the underlying cipher fails, which
    /// does not happen for well-formed inputs.
    pub fn seal(&self, plaintext: &[u8]) -> PensignResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self.cipher.encrypt(&nonce, plaintext).map_err(|e| {
            PensignError::Sealing {
                cause: format!("AES-GCM seal failed: {}", e),
                error_code: error_codes::SEAL_FAILED,
            }
        })?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a sealed artifact produced by [`AesGcm::seal`]
    ///
    /// Splits off the leading nonce and decrypts the remainder. An
    /// authentication failure means the digest does not match the one used
    /// at seal time and is reported as [`PensignError::IncorrectPin`].
    ///
    /// # Errors
    ///
    /// * `InvalidParameter` if the input is too short to contain a nonce and
    ///   an authentication tag (structurally not a sealed artifact).
    /// * `IncorrectPin` if authentication fails.
    pub fn open(&self, sealed: &[u8]) -> PensignResult<Vec<u8>> {
        if sealed.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(PensignError::invalid_parameter(
                "sealed",
                &format!("at least {} bytes", NONCE_LENGTH + TAG_LENGTH),
                &format!("{} bytes", sealed.len()),
            ));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let nonce = Nonce::from_slice(nonce);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| PensignError::IncorrectPin)
    }
}

/// Seal plaintext under a PIN digest
///
/// One-shot convenience wrapper around [`AesGcm::seal`].
pub fn seal(digest: &PinDigest, plaintext: &[u8]) -> PensignResult<Vec<u8>> {
    AesGcm::new(digest).seal(plaintext)
}

/// Open a sealed artifact under a PIN digest
///
/// One-shot convenience wrapper around [`AesGcm::open`].
pub fn open(digest: &PinDigest, sealed: &[u8]) -> PensignResult<Vec<u8>> {
    AesGcm::new(digest).open(sealed)
}
