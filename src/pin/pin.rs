use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Length of a PIN digest in bytes
///
/// This is the SHA-256 output length and, by construction, also the
/// AES-256 key length: the digest is fed to the cipher directly as key
/// material, with no truncation or extension.
pub const PIN_DIGEST_LENGTH: usize = 32;

// The digest-is-key contract only holds while both lengths agree.
const _: () = assert!(PIN_DIGEST_LENGTH == 32);

/// Fixed-length digest of a user PIN
///
/// The raw PIN never outlives the call that derives this digest; only the
/// digest is ever held, passed around, or used as key material, and it is
/// zeroed from memory when dropped. The digest is never persisted or logged.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct PinDigest {
    bytes: [u8; PIN_DIGEST_LENGTH],
}

impl PinDigest {
    /// Borrow the digest as key material
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for PinDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of debug output
        f.debug_struct("PinDigest").finish_non_exhaustive()
    }
}

/// Derive the symmetric key digest from a numeric PIN
///
/// The PIN's canonical byte representation is its fixed-width 8-byte
/// big-endian encoding, hashed with SHA-256. The encoding is fixed-width so
/// that every representable PIN value maps deterministically to exactly one
/// digest. Rejecting non-numeric input happens in the calling layer; this
/// function is pure and cannot fail.
///
/// # Arguments
///
/// * `pin` - The numeric PIN
///
/// # Returns
///
/// The 32-byte digest used as AES-256 key material
///
/// # Example
///
/// ```
/// use pensign::pin::derive_key_from_pin;
///
/// let a = derive_key_from_pin(1234);
/// let b = derive_key_from_pin(1234);
/// assert_eq!(a.as_bytes(), b.as_bytes());
/// ```
pub fn derive_key_from_pin(pin: u64) -> PinDigest {
    let mut canonical = pin.to_be_bytes();

    let mut hasher = Sha256::new();
    hasher.update(canonical);
    let digest = hasher.finalize();

    canonical.zeroize();

    let mut bytes = [0u8; PIN_DIGEST_LENGTH];
    bytes.copy_from_slice(&digest);
    PinDigest { bytes }
}
