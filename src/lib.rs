/*!
 * Pensign
 *
 * PIN-protected key custody and embedded PDF signatures.
 *
 * The crate generates an RSA-4096 signing keypair and splits custody of it
 * across two physical locations:
 *
 * - the public key and a self-signed X.509 certificate live on fixed
 *   storage and act as the trust anchor for verification,
 * - the private key, encrypted with AES-256-GCM under a key derived from a
 *   numeric PIN, lives on removable media and is decrypted only transiently
 *   during a signing session.
 *
 * Documents are signed by appending an incremental signature block after
 * the PDF content; every byte that existed before the block is covered by
 * the signature, so verification re-reads exactly the signed range.
 */

/// PIN canonicalization and digest derivation
pub mod pin;

/// AES-256-GCM sealing of the private artifact
pub mod aes;

/// Keypair generation, artifact encryption and certificate issuance
pub mod custody;

/// PDF byte-level format: markers, signature-block wire encoding
pub mod pdf;

/// Document signing state machine
pub mod document;

/// Signature verification against the trust anchor
pub mod verify;

/// Removable-media presence signal
pub mod media;

/// Common error types for the crate
pub mod error;

/// Utilities shared across modules
pub mod utils;

// Re-export main types for convenience
pub use custody::{PublicArtifact, SigningKeypair};
pub use document::{DocumentState, PrepareOutcome};
pub use error::{PensignError, PensignResult};
pub use media::{MediaEvent, MediaWatcher};
pub use pin::{derive_key_from_pin, PinDigest};
pub use verify::{TrustAnchor, VerificationOutcome};

use std::path::Path;

use log::info;
use rsa::RsaPrivateKey;
use x509_cert::Certificate;

/// Initialize the crate.
///
/// Call once before other operations. No setup is currently required; the
/// function exists so the API can absorb future backend initialization
/// without breaking callers.
///
/// # Example
///
/// ```
/// use pensign::prelude::*;
///
/// fn main() -> Result<(), PensignError> {
///     init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> PensignResult<()> {
    Ok(())
}

/// Artifacts produced by a custody split
///
/// The keypair itself is consumed by [`establish_custody`]; after the split
/// only the two serialized forms remain.
#[derive(Debug)]
pub struct CustodySplit {
    /// Public key and certificate, written to fixed storage
    pub public_artifact: custody::PublicArtifact,
    /// Path of the encrypted private key on removable media
    pub private_artifact_path: std::path::PathBuf,
}

/// Generate a keypair and split custody across fixed and removable storage
///
/// Orchestrates the full key-establishment flow: keypair generation,
/// self-signed certificate issuance, PIN-based encryption of the private
/// key, and export of both artifacts. The in-memory keypair is consumed and
/// dropped before the function returns; afterwards the filesystem holds the
/// only copies.
///
/// # Arguments
///
/// * `pin` - Numeric PIN protecting the private artifact
/// * `common_name` - Subject CN for the self-signed certificate
/// * `fixed_dir` - Directory on fixed storage for the public artifact
/// * `media_dir` - Directory on removable media for the private artifact
///
/// # Errors
///
/// `KeyGeneration`, `Certificate`, `Sealing`, or `Io` depending on the
/// failing stage. On error no guarantee is made about partially written
/// artifacts; callers should treat the split as all-or-nothing and re-run.
pub fn establish_custody(
    pin: u64,
    common_name: &str,
    fixed_dir: &Path,
    media_dir: &Path,
) -> PensignResult<CustodySplit> {
    let keypair = SigningKeypair::generate()?;
    establish_custody_with(keypair, pin, common_name, fixed_dir, media_dir)
}

/// Custody split for an already generated keypair
///
/// Split out of [`establish_custody`] so callers controlling key generation
/// (or testing with a smaller modulus) reuse the same export flow.
pub fn establish_custody_with(
    keypair: SigningKeypair,
    pin: u64,
    common_name: &str,
    fixed_dir: &Path,
    media_dir: &Path,
) -> PensignResult<CustodySplit> {
    let certificate =
        custody::issue_self_signed_certificate(&keypair, common_name, custody::DEFAULT_VALIDITY)?;

    let digest = derive_key_from_pin(pin);
    let sealed = custody::encrypt_private_key(&digest, &keypair)?;

    let public_artifact = custody::export_public_artifact(&keypair, &certificate)?;
    public_artifact.write_to(fixed_dir)?;
    let private_artifact_path = custody::export_private_artifact(media_dir, &sealed)?;

    info!("custody split complete for CN={}", common_name);

    Ok(CustodySplit {
        public_artifact,
        private_artifact_path,
    })
}

/// Recover the private key from removable media for one signing session
///
/// Checks media presence first, then reads and decrypts the artifact. The
/// returned key lives only as long as the caller keeps it; nothing is
/// cached.
///
/// # Errors
///
/// * `ArtifactUnavailable` if the media is not attached.
/// * `IncorrectPin` if the PIN does not decrypt the artifact.
/// * `InvalidParameter` if the file is not a private artifact at all.
pub fn unlock_private_key(artifact_path: &Path, pin: u64) -> PensignResult<RsaPrivateKey> {
    media::require_present(artifact_path)?;

    let sealed = std::fs::read(artifact_path)?;
    let digest = derive_key_from_pin(pin);
    custody::decrypt_private_key(&digest, &sealed)
}

/// Sign one document end to end
///
/// Runs the full session: reserve the signature field in `source`, sign the
/// reserved document, write the signed bytes durably to `destination`, and
/// delete `source`. A document that is already signed or not writable
/// short-circuits with the corresponding [`PrepareOutcome`] and leaves both
/// paths untouched.
///
/// The private key is borrowed for the duration of the call only.
pub fn sign_document(
    source: &Path,
    destination: &Path,
    private_key: &RsaPrivateKey,
    certificate: &Certificate,
) -> PensignResult<PrepareOutcome> {
    match document::reserve_signature_field(source)? {
        PrepareOutcome::Prepared => {}
        outcome => return Ok(outcome),
    }

    let signed = document::sign(source, private_key, certificate)?;
    document::finalize(&signed, source, destination)?;

    Ok(PrepareOutcome::Prepared)
}

/// Verify the signature of a document on disk
///
/// Reads the document and checks its embedded signature against `anchor`.
/// Absence of a signature is reported as
/// [`VerificationOutcome::NoSignaturePresent`], not as an error.
pub fn verify_document(path: &Path, anchor: &TrustAnchor) -> PensignResult<VerificationOutcome> {
    let bytes = std::fs::read(path)?;
    verify::verify(&bytes, anchor)
}

/// The most commonly used types and operations in one import.
pub mod prelude {
    pub use crate::custody::{
        decrypt_private_key, encrypt_private_key, issue_self_signed_certificate,
    };
    pub use crate::derive_key_from_pin;
    pub use crate::document::{finalize, reserve_signature_field, sign};
    pub use crate::establish_custody;
    pub use crate::init;
    pub use crate::media::require_present;
    pub use crate::sign_document;
    pub use crate::unlock_private_key;
    pub use crate::verify::{extract_signature, load_trust_anchor, verify};
    pub use crate::verify_document;
    pub use crate::CustodySplit;
    pub use crate::DocumentState;
    pub use crate::MediaEvent;
    pub use crate::MediaWatcher;
    pub use crate::PensignError;
    pub use crate::PensignResult;
    pub use crate::PinDigest;
    pub use crate::PrepareOutcome;
    pub use crate::PublicArtifact;
    pub use crate::SigningKeypair;
    pub use crate::TrustAnchor;
    pub use crate::VerificationOutcome;
}
